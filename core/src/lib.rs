//! NF pipeline scripting engine
//!
//! Compile NF script text once, run it many times:
//!
//! ```
//! use nf_core::{Engine, HostContext, Value};
//!
//! let engine = Engine::builder().build()?;
//! let host = HostContext::new().with("preValue", 2);
//! let value = engine.run("export $preValue * 21", None, &host)?;
//! assert_eq!(value, Some(Value::Int(42)));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod interpreter;
pub mod monitor;

pub use cache::{ScriptCache, ScriptRegistry};
pub use config::Config;
pub use engine::{Engine, EngineBuilder};
pub use interpreter::{HostContext, NfError, Script, ScriptLogger, Value};
pub use monitor::PerformanceMonitor;
