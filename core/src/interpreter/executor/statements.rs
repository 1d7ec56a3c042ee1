//! Statement handlers
//!
//! One method per [`NodeKind`]. Handlers return the [`Flow`] the statement
//! produced; only loops, function calls and the run itself absorb non-normal
//! flow.

use tracing::info;

use super::{runtime_error, Interpreter, MAX_CALL_DEPTH};
use crate::interpreter::context::{ExecutionContext, ScopeKind};
use crate::interpreter::errors::{NfError, RuntimeErrorKind};
use crate::interpreter::expressions::values_equal;
use crate::interpreter::types::{CallSpec, Expr, Flow, Iterable, Node, NodeKind, Rhs, Value};

impl<'r> Interpreter<'r> {
    pub(super) fn dispatch<'a>(&self, node: &'a Node, ctx: &mut ExecutionContext<'a>) -> Result<Flow, NfError> {
        let line = node.line;
        match &node.kind {
            NodeKind::Import { path, alias } => {
                ctx.register_import(alias, path);
                ctx.declare(alias, Value::type_handle(path), None);
                Ok(Flow::Normal)
            }
            NodeKind::Declare {
                name,
                declared_type,
                value,
            } => {
                let value = match value {
                    Some(rhs) => self.eval_rhs(rhs, ctx, line)?,
                    None => Value::Null,
                };
                if let Some(declared) = declared_type {
                    check_type(name, declared, &value, line)?;
                }
                ctx.declare(name, value, declared_type.clone());
                Ok(Flow::Normal)
            }
            NodeKind::Assign { name, value } => {
                let value = self.eval_rhs(value, ctx, line)?;
                if let Some(declared) = ctx.lookup_info(name).and_then(|i| i.declared_type.as_deref()) {
                    check_type(name, declared, &value, line)?;
                }
                ctx.assign(name, value);
                Ok(Flow::Normal)
            }
            NodeKind::Run { call } => {
                self.run_task(call, ctx, line)?;
                Ok(Flow::Normal)
            }
            NodeKind::Task { target, tasks } => {
                let merged = self.fan_out(tasks, ctx)?;
                ctx.assign(target, merged);
                Ok(Flow::Normal)
            }
            NodeKind::Export { value } => {
                let value = self.eval(value, ctx, line)?;
                ctx.set_export(value);
                Ok(Flow::Normal)
            }
            NodeKind::Echo { value } => {
                let message = self.eval(value, ctx, line)?.to_string();
                match ctx.logger() {
                    Some(logger) => logger.echo(ctx.run_id(), line, &message),
                    None => info!(target: "nf::echo", run_id = ctx.run_id(), line, "{}", message),
                }
                Ok(Flow::Normal)
            }
            NodeKind::If => self.execute_if(node, ctx),
            NodeKind::Switch { subject } => self.execute_switch(node, subject, ctx),
            NodeKind::For { var, iterable } => self.execute_for(node, var, iterable, ctx),
            NodeKind::While { condition } => self.execute_while(node, condition, ctx),
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::BreakAll => Ok(Flow::BreakAll),
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval(expr, ctx, line)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            // Hoisted by `execute`
            NodeKind::FunctionDef { .. } => Ok(Flow::Normal),
            NodeKind::Call { call } => {
                self.call_named(call, ctx, line)?;
                Ok(Flow::Normal)
            }
            NodeKind::Branch { .. } | NodeKind::Else | NodeKind::Case { .. } | NodeKind::Default => {
                Err(runtime_error(
                    line,
                    RuntimeErrorKind::Evaluation,
                    format!("'{}' cannot run outside its statement", node.name()),
                ))
            }
        }
    }

    /// Run `nodes` in a fresh child scope
    fn execute_block<'a>(
        &self,
        nodes: &'a [Node],
        kind: ScopeKind,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Flow, NfError> {
        let scope = ctx.push_scope(kind);
        let flow = self.execute(nodes, ctx);
        ctx.pop_scope(scope);
        flow
    }

    /* ===================== Conditionals ===================== */

    fn execute_if<'a>(&self, node: &'a Node, ctx: &mut ExecutionContext<'a>) -> Result<Flow, NfError> {
        for arm in &node.children {
            match &arm.kind {
                NodeKind::Branch { condition } => {
                    if self.eval(condition, ctx, arm.line)?.is_truthy() {
                        return self.execute_block(&arm.children, ScopeKind::Block, ctx);
                    }
                }
                NodeKind::Else => return self.execute_block(&arm.children, ScopeKind::Block, ctx),
                _ => {}
            }
        }
        Ok(Flow::Normal)
    }

    /// First matching case runs; there is no fall-through
    fn execute_switch<'a>(
        &self,
        node: &'a Node,
        subject: &Expr,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Flow, NfError> {
        let subject = self.eval(subject, ctx, node.line)?;
        let mut default = None;

        for arm in &node.children {
            match &arm.kind {
                NodeKind::Case { value } => {
                    let candidate = self.eval(value, ctx, arm.line)?;
                    if values_equal(&subject, &candidate) {
                        return self.execute_block(&arm.children, ScopeKind::Block, ctx);
                    }
                }
                NodeKind::Default => default = Some(arm),
                _ => {}
            }
        }

        match default {
            Some(arm) => self.execute_block(&arm.children, ScopeKind::Block, ctx),
            None => Ok(Flow::Normal),
        }
    }

    /* ===================== Loops ===================== */

    fn execute_for<'a>(
        &self,
        node: &'a Node,
        var: &str,
        iterable: &Iterable,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Flow, NfError> {
        let mut items: Box<dyn Iterator<Item = Value>> = match iterable {
            Iterable::Range {
                start,
                end,
                inclusive,
            } => {
                let start = self.range_bound(start, ctx, node.line)?;
                let end = self.range_bound(end, ctx, node.line)?;
                if *inclusive {
                    Box::new((start..=end).map(Value::Int))
                } else {
                    Box::new((start..end).map(Value::Int))
                }
            }
            Iterable::Each { expr } => match self.eval(expr, ctx, node.line)? {
                Value::List(items) => Box::new(items.into_iter()),
                Value::Map(map) => Box::new(map.into_keys().map(Value::from)),
                Value::Str(s) => Box::new(
                    s.chars()
                        .map(|c| Value::str(c.to_string()))
                        .collect::<Vec<_>>()
                        .into_iter(),
                ),
                Value::Null => Box::new(std::iter::empty()),
                other => {
                    return Err(runtime_error(
                        node.line,
                        RuntimeErrorKind::Type,
                        format!("cannot iterate over a {}", other.type_name()),
                    ))
                }
            },
        };

        ctx.enter_loop();
        let result = self.run_iterations(node, ctx, |_, ctx| match items.next() {
            Some(item) => {
                ctx.declare(var, item, None);
                Ok(true)
            }
            None => Ok(false),
        });
        ctx.exit_loop();
        result
    }

    fn range_bound(&self, expr: &Expr, ctx: &ExecutionContext<'_>, line: usize) -> Result<i64, NfError> {
        match self.eval(expr, ctx, line)? {
            Value::Int(i) => Ok(i),
            other => Err(runtime_error(
                line,
                RuntimeErrorKind::Type,
                format!("range bounds must be integers, got {} '{}'", other.type_name(), expr.source),
            )),
        }
    }

    fn execute_while<'a>(
        &self,
        node: &'a Node,
        condition: &Expr,
        ctx: &mut ExecutionContext<'a>,
    ) -> Result<Flow, NfError> {
        ctx.enter_loop();
        let result = self.run_iterations(node, ctx, |this, ctx| {
            Ok(this.eval(condition, ctx, node.line)?.is_truthy())
        });
        ctx.exit_loop();
        result
    }

    /// Drive a loop body. `next` runs inside each iteration's fresh scope and
    /// returns `false` when the loop is done.
    fn run_iterations<'a, F>(
        &self,
        node: &'a Node,
        ctx: &mut ExecutionContext<'a>,
        mut next: F,
    ) -> Result<Flow, NfError>
    where
        F: FnMut(&Self, &mut ExecutionContext<'a>) -> Result<bool, NfError>,
    {
        loop {
            ctx.check_deadline(node.line)?;

            let scope = ctx.push_scope(ScopeKind::Block);
            let flow = match next(self, ctx) {
                Ok(true) => self.execute(&node.children, ctx),
                Ok(false) => {
                    ctx.pop_scope(scope);
                    return Ok(Flow::Normal);
                }
                Err(e) => Err(e),
            };
            ctx.pop_scope(scope);

            match flow? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                Flow::BreakAll if ctx.loop_depth() <= 1 => return Ok(Flow::Normal),
                other => return Ok(other),
            }
        }
    }

    /* ===================== Calls ===================== */

    fn eval_rhs<'a>(&self, rhs: &Rhs, ctx: &mut ExecutionContext<'a>, line: usize) -> Result<Value, NfError> {
        match rhs {
            Rhs::Expr { expr } => self.eval(expr, ctx, line),
            Rhs::Run { call } => self.run_task(call, ctx, line),
            Rhs::Invoke { call, source } => {
                if let Some(def) = ctx.function(&call.name) {
                    let args = self.eval_args(&call.args, ctx, line)?;
                    return self.call_function(def, args, ctx, line);
                }
                if self.services.tasks.contains(ctx.resolve_alias(&call.name)) {
                    return self.run_task(call, ctx, line);
                }
                self.eval(source, ctx, line)
            }
        }
    }

    /// Statement-level `name(args)`: user function, then task
    fn call_named<'a>(&self, call: &CallSpec, ctx: &mut ExecutionContext<'a>, line: usize) -> Result<Value, NfError> {
        if let Some(def) = ctx.function(&call.name) {
            let args = self.eval_args(&call.args, ctx, line)?;
            return self.call_function(def, args, ctx, line);
        }
        if self.services.tasks.contains(ctx.resolve_alias(&call.name)) {
            return self.run_task(call, ctx, line);
        }
        Err(runtime_error(
            line,
            RuntimeErrorKind::UndefinedFunction,
            format!("no function or task named '{}'", call.name),
        ))
    }

    /// Synchronous task call on the interpreting thread
    fn run_task(&self, call: &CallSpec, ctx: &ExecutionContext<'_>, line: usize) -> Result<Value, NfError> {
        let args = self.eval_args(&call.args, ctx, line)?;
        let name = ctx.resolve_alias(&call.name);
        let task = self.services.tasks.get(name).ok_or_else(|| {
            runtime_error(
                line,
                RuntimeErrorKind::UnknownTask,
                format!("unknown task '{}'", name),
            )
        })?;
        task.call(&args).map_err(|e| {
            runtime_error(
                line,
                RuntimeErrorKind::Task,
                format!("task '{}' failed: {:#}", name, e),
            )
        })
    }

    fn call_function<'a>(
        &self,
        def: &'a Node,
        args: Vec<Value>,
        ctx: &mut ExecutionContext<'a>,
        line: usize,
    ) -> Result<Value, NfError> {
        let NodeKind::FunctionDef { name, params } = &def.kind else {
            return Err(runtime_error(
                line,
                RuntimeErrorKind::UndefinedFunction,
                format!("'{}' is not a function", def.name()),
            ));
        };
        if args.len() != params.len() {
            return Err(runtime_error(
                line,
                RuntimeErrorKind::Arity,
                format!(
                    "function '{}' takes {} argument(s), got {}",
                    name,
                    params.len(),
                    args.len()
                ),
            ));
        }
        if ctx.call_depth() >= MAX_CALL_DEPTH {
            return Err(runtime_error(
                line,
                RuntimeErrorKind::CallDepth,
                format!("call depth limit of {} exceeded calling '{}'", MAX_CALL_DEPTH, name),
            ));
        }

        let saved_loop_depth = ctx.enter_function();
        let scope = ctx.push_scope(ScopeKind::Function);
        for (param, arg) in params.iter().zip(args) {
            ctx.declare(param, arg, None);
        }
        let flow = self.execute(&def.children, ctx);
        ctx.pop_scope(scope);
        ctx.exit_function(saved_loop_depth);

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }
}

fn check_type(name: &str, declared: &str, value: &Value, line: usize) -> Result<(), NfError> {
    if value.matches_type(declared) == Some(false) {
        return Err(runtime_error(
            line,
            RuntimeErrorKind::Type,
            format!(
                "'{}' is declared as {} but got a {}",
                name,
                declared,
                value.type_name()
            ),
        ));
    }
    Ok(())
}
