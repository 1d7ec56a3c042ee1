//! Script output sink
//!
//! `echo` writes through the logger attached to the run's context. Hosts that
//! want the output pass their own implementation; the default forwards to
//! `tracing`.

use std::sync::{Arc, Mutex};

use tracing::info;

pub trait ScriptLogger: Send + Sync {
    /// One `echo` line
    fn echo(&self, run_id: &str, line: usize, message: &str);
}

/// Forwards `echo` output to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ScriptLogger for TracingLogger {
    fn echo(&self, run_id: &str, line: usize, message: &str) {
        info!(target: "nf::echo", run_id, line, "{}", message);
    }
}

/// Collects `echo` output in memory (CLI capture and tests)
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything echoed so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ScriptLogger for MemoryLogger {
    fn echo(&self, _run_id: &str, _line: usize, message: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}
