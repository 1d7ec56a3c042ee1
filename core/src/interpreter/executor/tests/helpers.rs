//! Test helpers for executor tests
//!
//! Common utilities for compiling scripts and running them against a fresh
//! context.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;

use crate::interpreter::context::{ExecutionContext, HostContext};
use crate::interpreter::errors::{NfError, RuntimeError, RuntimeErrorKind};
use crate::interpreter::executor::{Interpreter, Services};
use crate::interpreter::logger::{MemoryLogger, ScriptLogger};
use crate::interpreter::pools::PoolRegistry;
use crate::interpreter::stdlib::TaskRegistry;
use crate::interpreter::types::{Script, Value};
use crate::interpreter::{compile, NfEvaluator};

/// What a finished run left behind
pub struct Outcome {
    pub result: Result<Option<Value>, NfError>,
    pub echoed: Vec<String>,
}

impl Outcome {
    /// Exported value of a run that must succeed
    pub fn export(self) -> Option<Value> {
        self.result.expect("Run should succeed")
    }

    pub fn runtime_error(self) -> RuntimeError {
        match self.result {
            Err(NfError::Runtime(e)) => e,
            other => panic!("Expected a runtime error, got {:?}", other),
        }
    }
}

/// Standard tasks plus a few test tasks:
/// - `double(n)`: `n * 2`
/// - `explode()`: panics
/// - `threadName()`: name of the thread running the task
pub fn test_services() -> Services {
    let mut tasks = TaskRegistry::with_defaults();
    tasks.register("double", |args: &[Value]| -> anyhow::Result<Value> {
        match args.first() {
            Some(Value::Int(n)) => Ok(Value::Int(n * 2)),
            other => bail!("double() expects an int, got {:?}", other),
        }
    });
    tasks.register("explode", |_args: &[Value]| -> anyhow::Result<Value> {
        panic!("kaboom");
    });
    tasks.register("threadName", |_args: &[Value]| -> anyhow::Result<Value> {
        Ok(std::thread::current()
            .name()
            .map(Value::from)
            .unwrap_or(Value::Null))
    });

    let mut named = BTreeMap::new();
    named.insert("io".to_string(), 1);
    let pools = PoolRegistry::new(2, &named).expect("Should build pools");

    Services::new(Arc::new(NfEvaluator::new()), Arc::new(tasks), Arc::new(pools))
}

pub fn compile_ok(source: &str) -> Script {
    compile(source).expect("Should compile")
}

pub fn run_with(source: &str, host: &HostContext, max_duration: Option<Duration>) -> Outcome {
    let script = compile_ok(source);
    let services = test_services();
    let logger = MemoryLogger::new();
    let handle: Arc<dyn ScriptLogger> = Arc::new(logger.clone());

    let result = {
        let mut ctx = ExecutionContext::new(host)
            .with_logger(Some(handle))
            .with_max_duration(max_duration);
        Interpreter::new(&services, None).run(&script, &mut ctx)
    };

    Outcome {
        result,
        echoed: logger.lines(),
    }
}

pub fn run_script(source: &str) -> Outcome {
    run_with(source, &HostContext::new(), None)
}

/// Export of a script that must run cleanly
pub fn export_of(source: &str) -> Option<Value> {
    run_script(source).export()
}

pub fn runtime_error_of(source: &str) -> RuntimeError {
    run_script(source).runtime_error()
}

pub fn assert_kind(err: &RuntimeError, kind: RuntimeErrorKind) {
    assert_eq!(err.kind, kind, "unexpected error: {}", err);
}
