//! # Executor - Tree-Walking Interpreter
//!
//! Walks a validated statement list against an [`ExecutionContext`].
//!
//! ## Core Principles
//!
//! 1. **Flow, not unwinding**: every statement returns a [`Flow`]; `Return` is
//!    absorbed at the function-call boundary, `Break`/`Continue` at the nearest
//!    loop, `BreakAll` at the outermost loop of the current function frame
//! 2. **One scope per block**: branches, cases, loop iterations and function
//!    bodies each run in a freshly pushed child scope
//! 3. **Hoisting**: the `function` definitions of a statement list are
//!    registered before the list runs
//! 4. **Cooperative timeout**: the deadline is checked before every statement
//!    and every loop iteration
//! 5. **Fan-out**: `task` blocks dispatch onto a rayon pool and join before the
//!    next statement (see [`fanout`])

mod fanout;
mod statements;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use super::context::ExecutionContext;
use super::errors::{NfError, RuntimeError, RuntimeErrorKind};
use super::expressions::{ExpressionEvaluator, NfEvaluator};
use super::pools::PoolRegistry;
use super::stdlib::TaskRegistry;
use super::types::{Expr, Flow, Node, NodeKind, Script, Value};
use crate::monitor::PerformanceMonitor;

/// Nested user-function calls allowed before a run fails
pub const MAX_CALL_DEPTH: usize = 256;

/// Everything a run needs besides its context, shared across runs
#[derive(Clone)]
pub struct Services {
    pub evaluator: Arc<dyn ExpressionEvaluator>,
    pub tasks: Arc<TaskRegistry>,
    pub pools: Arc<PoolRegistry>,
}

impl Services {
    pub fn new(
        evaluator: Arc<dyn ExpressionEvaluator>,
        tasks: Arc<TaskRegistry>,
        pools: Arc<PoolRegistry>,
    ) -> Self {
        Self {
            evaluator,
            tasks,
            pools,
        }
    }

    /// Built-in evaluator and standard tasks on the given pools
    pub fn with_pools(pools: PoolRegistry) -> Self {
        Self::new(
            Arc::new(NfEvaluator::new()),
            Arc::new(TaskRegistry::with_defaults()),
            Arc::new(pools),
        )
    }
}

pub struct Interpreter<'r> {
    services: &'r Services,
    monitor: Option<&'r PerformanceMonitor>,
}

impl<'r> Interpreter<'r> {
    pub fn new(services: &'r Services, monitor: Option<&'r PerformanceMonitor>) -> Self {
        Self { services, monitor }
    }

    /// Run a whole script and return its exported value, if any
    pub fn run<'a>(
        &self,
        script: &'a Script,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Option<Value>, NfError> {
        self.execute(&script.nodes, ctx)?;
        Ok(ctx.take_export())
    }

    /// Execute a statement list in the current scope
    pub fn execute<'a>(
        &self,
        nodes: &'a [Node],
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Flow, NfError> {
        for node in nodes {
            if let NodeKind::FunctionDef { name, .. } = &node.kind {
                ctx.define_function(name, node);
            }
        }

        for node in nodes {
            ctx.check_deadline(node.line)?;
            let flow = self.execute_node(node, ctx)?;
            if !flow.is_normal() {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_node<'a>(&self, node: &'a Node, ctx: &mut ExecutionContext<'a>) -> Result<Flow, NfError> {
        trace!(line = node.line, kind = node.name(), "executing");
        let Some(monitor) = self.monitor else {
            return self.dispatch(node, ctx);
        };

        let started = Instant::now();
        let result = self.dispatch(node, ctx);
        monitor.record(node.name(), started.elapsed());
        result
    }

    /* ===================== Helpers ===================== */

    /// Evaluate an expression against every binding visible from the current scope
    pub(crate) fn eval(
        &self,
        expr: &Expr,
        ctx: &ExecutionContext<'_>,
        line: usize,
    ) -> Result<Value, NfError> {
        let vars = ctx.flatten();
        self.services
            .evaluator
            .evaluate(&expr.source, &vars)
            .map_err(|e| NfError::Runtime(e.at(line)))
    }

    pub(crate) fn eval_args(
        &self,
        args: &[Expr],
        ctx: &ExecutionContext<'_>,
        line: usize,
    ) -> Result<Vec<Value>, NfError> {
        args.iter().map(|arg| self.eval(arg, ctx, line)).collect()
    }
}

pub(crate) fn runtime_error(line: usize, kind: RuntimeErrorKind, message: impl Into<String>) -> NfError {
    NfError::Runtime(RuntimeError::new(line, kind, message))
}
