//! `task` fan-out
//!
//! Every entry of a `task` block is dispatched onto the run's rayon pool and
//! the block joins before the next statement. Arguments are evaluated up front
//! on the interpreting thread, so sub-tasks never touch the context.
//!
//! A failing or panicking sub-task is logged and its key is left out of the
//! result map; the run continues.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::Interpreter;
use crate::interpreter::context::ExecutionContext;
use crate::interpreter::errors::{NfError, SubTaskError};
use crate::interpreter::stdlib::Task;
use crate::interpreter::types::{TaskSpec, Value};

struct Job {
    key: String,
    name: String,
    line: usize,
    task: Arc<dyn Task>,
    args: Vec<Value>,
}

type Outcome = (String, Result<Value, SubTaskError>);

impl<'r> Interpreter<'r> {
    /// Run every entry concurrently and merge the successful results by key
    pub(super) fn fan_out(&self, specs: &[TaskSpec], ctx: &ExecutionContext<'_>) -> Result<Value, NfError> {
        let mut jobs = Vec::with_capacity(specs.len());
        for spec in specs {
            let args = self.eval_args(&spec.call.args, ctx, spec.line)?;
            let name = ctx.resolve_alias(&spec.call.name).to_string();
            match self.services.tasks.get(&name) {
                Some(task) => jobs.push(Job {
                    key: spec.key.clone(),
                    name,
                    line: spec.line,
                    task,
                    args,
                }),
                None => {
                    let err = SubTaskError {
                        key: spec.key.clone(),
                        task: name,
                        line: spec.line,
                        message: "unknown task".to_string(),
                    };
                    warn!(run_id = ctx.run_id(), "{}", err);
                }
            }
        }

        let pool = self.services.pools.resolve(ctx.thread_factory_name());
        let started = Instant::now();
        let expected = jobs.len();
        let (tx, rx) = mpsc::channel::<Outcome>();

        pool.scope(|scope| {
            for job in jobs {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = run_job(&job);
                    // Receiver outlives the scope
                    let _ = tx.send((job.key, outcome));
                });
            }
        });
        drop(tx);

        let mut merged = BTreeMap::new();
        for (key, outcome) in rx {
            match outcome {
                Ok(value) => {
                    merged.insert(key, value);
                }
                Err(err) => warn!(run_id = ctx.run_id(), "{}", err),
            }
        }

        debug!(
            run_id = ctx.run_id(),
            dispatched = expected,
            succeeded = merged.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task block joined"
        );
        Ok(Value::Map(merged))
    }
}

fn run_job(job: &Job) -> Result<Value, SubTaskError> {
    let failure = |message: String| SubTaskError {
        key: job.key.clone(),
        task: job.name.clone(),
        line: job.line,
        message,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| job.task.call(&job.args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(failure(format!("{:#}", e))),
        Err(payload) => Err(failure(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
