//! Error types surfaced by the NF pipeline
//!
//! - [`SyntaxError`]: lexer, parser and validator failures. Nothing executes.
//! - [`RuntimeError`]: a statement or expression failed during a run.
//! - [`NfError::Timeout`]: the run exceeded its time budget.
//! - [`SubTaskError`]: one fan-out task failed. Logged, never propagated.
//! - [`RegistryError`]: named-script registry misuse.

use std::fmt;
use thiserror::Error;

/* ===================== Syntax Errors ===================== */

/// Which stage and rule family produced a syntax error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxCategory {
    /// Unbalanced or mismatched `{}`, `[]`, `()`
    Bracket,
    /// Unterminated string literal or bad escape
    String,
    /// Character or literal the lexer cannot scan
    Token,
    /// No statement rule matched, or a rule failed half way
    Statement,
    /// Malformed AST shape
    Structure,
    /// `break`/`continue`/`breakAll`/`return` outside their construct
    ControlFlow,
}

impl fmt::Display for SyntaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyntaxCategory::Bracket => "bracket",
            SyntaxCategory::String => "string",
            SyntaxCategory::Token => "token",
            SyntaxCategory::Statement => "statement",
            SyntaxCategory::Structure => "structure",
            SyntaxCategory::ControlFlow => "control-flow",
        };
        f.write_str(label)
    }
}

/// Structured compile-time error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error [{category}] at line {line}: {message}\n  near: {context}\n  help: {suggestion}")]
pub struct SyntaxError {
    /// 1-based line
    pub line: usize,
    pub category: SyntaxCategory,
    pub message: String,
    /// Short rendering of the source around the failure
    pub context: String,
    pub suggestion: String,
}

impl SyntaxError {
    pub fn new(
        line: usize,
        category: SyntaxCategory,
        message: impl Into<String>,
        context: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            line,
            category,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
        }
    }
}

/* ===================== Runtime Errors ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    UndefinedFunction,
    UnknownTask,
    Type,
    Arity,
    DivisionByZero,
    Evaluation,
    Task,
    CallDepth,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RuntimeErrorKind::UndefinedVariable => "undefined-variable",
            RuntimeErrorKind::UndefinedFunction => "undefined-function",
            RuntimeErrorKind::UnknownTask => "unknown-task",
            RuntimeErrorKind::Type => "type",
            RuntimeErrorKind::Arity => "arity",
            RuntimeErrorKind::DivisionByZero => "division-by-zero",
            RuntimeErrorKind::Evaluation => "evaluation",
            RuntimeErrorKind::Task => "task",
            RuntimeErrorKind::CallDepth => "call-depth",
        };
        f.write_str(label)
    }
}

/// A statement failed while the script was running
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("runtime error [{kind}] at line {line}: {message}")]
pub struct RuntimeError {
    pub line: usize,
    pub kind: RuntimeErrorKind,
    pub message: String,
}

impl RuntimeError {
    pub fn new(line: usize, kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
        }
    }
}

/// Expression evaluator failure, before a line number is attached
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: RuntimeErrorKind,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn at(self, line: usize) -> RuntimeError {
        RuntimeError::new(line, self.kind, self.message)
    }
}

/* ===================== Fan-out Errors ===================== */

/// One concurrent sub-task of a `task` statement failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sub-task '{key}' ({task}) at line {line} failed: {message}")]
pub struct SubTaskError {
    pub key: String,
    pub task: String,
    pub line: usize,
    pub message: String,
}

/* ===================== Registry Errors ===================== */

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("script '{0}' is already registered")]
    Duplicate(String),

    #[error("script '{0}' is not registered")]
    NotFound(String),

    #[error("script '{name}' failed to compile: {source}")]
    Invalid {
        name: String,
        #[source]
        source: SyntaxError,
    },
}

/* ===================== Top-level Error ===================== */

/// Every fatal error a host can receive from the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NfError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("script timed out at line {line}: ran {elapsed_ms} ms, limit is {limit_ms} ms")]
    Timeout {
        line: usize,
        elapsed_ms: u128,
        limit_ms: u128,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
