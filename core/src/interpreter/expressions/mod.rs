//! Expression evaluation
//!
//! The interpreter never looks inside an expression; it hands the source text
//! and a flattened variable table to an [`ExpressionEvaluator`]. [`NfEvaluator`]
//! is the built-in implementation: literals, variables (including `$` system
//! names), member access, indexing, list literals, unary/binary/ternary
//! operators, and the [`builtins::BUILTINS`] functions.
//!
//! Parsed expression trees are memoized per source text, so a loop body pays
//! for parsing once. The memo is bounded: once it holds `capacity` trees it is
//! emptied and refilled, and [`ExpressionEvaluator::clear`] drops it outright.

pub mod builtins;
mod eval;
mod parse;

use std::sync::Arc;

use dashmap::DashMap;

use super::context::VarTable;
use super::errors::EvalError;
use super::types::Value;

use parse::ExprNode;

pub(crate) use eval::values_equal;

/// Distinct expressions [`NfEvaluator`] keeps parsed at once
pub const DEFAULT_MEMO_CAPACITY: usize = 4096;

/// Pluggable expression evaluator
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, source: &str, vars: &VarTable<'_>) -> Result<Value, EvalError>;

    /// Drop any state kept between runs
    fn clear(&self) {}
}

#[derive(Debug)]
pub struct NfEvaluator {
    parsed: DashMap<String, Arc<ExprNode>>,
    capacity: usize,
}

impl Default for NfEvaluator {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMO_CAPACITY)
    }
}

impl NfEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator whose memo holds at most `capacity` parsed expressions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parsed: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn parsed(&self, source: &str) -> Result<Arc<ExprNode>, EvalError> {
        if let Some(node) = self.parsed.get(source) {
            return Ok(Arc::clone(node.value()));
        }
        let node = Arc::new(parse::parse_expression(source)?);
        if self.parsed.len() >= self.capacity {
            self.parsed.clear();
        }
        self.parsed.insert(source.to_string(), Arc::clone(&node));
        Ok(node)
    }

    /// Number of distinct expressions currently memoized
    pub fn cached_expressions(&self) -> usize {
        self.parsed.len()
    }
}

impl ExpressionEvaluator for NfEvaluator {
    fn evaluate(&self, source: &str, vars: &VarTable<'_>) -> Result<Value, EvalError> {
        let node = self.parsed(source)?;
        eval::eval(&node, vars)
    }

    fn clear(&self) {
        self.parsed.clear();
    }
}
