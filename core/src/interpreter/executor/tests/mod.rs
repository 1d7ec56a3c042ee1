//! Executor tests
//!
//! Organized by statement family

mod basic_tests;
mod helpers;
mod if_tests;
mod loop_tests;
mod scope_tests;
mod task_tests;
mod timeout_tests;
