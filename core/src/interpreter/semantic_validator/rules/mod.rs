//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `block_structure.rs` - Node shapes and parent/child kinds
//! - `loop_control.rs` - `break`/`breakAll`/`continue` only inside loops
//! - `return_outside_function.rs` - `return` only inside functions
//! - `duplicate_function.rs` - One definition per name per statement list

mod block_structure;
mod duplicate_function;
mod loop_control;
mod return_outside_function;

pub use block_structure::BlockStructureRule;
pub use duplicate_function::DuplicateFunctionRule;
pub use loop_control::LoopControlRule;
pub use return_outside_function::ReturnOutsideFunctionRule;
