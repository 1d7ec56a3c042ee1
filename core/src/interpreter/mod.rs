//! # NF Interpreter
//!
//! The compile pipeline and the tree-walking executor.
//!
//! ```text
//! text ──tokenize──▶ tokens ──parse──▶ nodes ──validate──▶ Script ──execute──▶ export
//! ```
//!
//! [`compile`] runs the first three stages and stamps the result with the
//! SHA-256 of the text. A compiled [`Script`] is immutable and shared across
//! runs (the cache hands out `Arc<Script>`); every run gets its own
//! [`ExecutionContext`].

pub mod context;
pub mod errors;
pub mod executor;
pub mod expressions;
pub mod lexer;
pub mod logger;
pub mod parser;
pub mod pools;
pub mod semantic_validator;
pub mod stdlib;
pub mod types;


use sha2::{Digest, Sha256};
use tracing::debug;

pub use context::{ExecutionContext, HostContext, ScopeId, ScopeKind, VarTable, VariableInfo};
pub use errors::{
    EvalError, NfError, RegistryError, RuntimeError, RuntimeErrorKind, SubTaskError, SyntaxCategory,
    SyntaxError,
};
pub use executor::{Interpreter, Services};
pub use expressions::{ExpressionEvaluator, NfEvaluator};
pub use logger::{MemoryLogger, ScriptLogger, TracingLogger};
pub use pools::PoolRegistry;
pub use stdlib::{Task, TaskRegistry};
pub use types::{Flow, Node, NodeKind, Script, Token, TokenKind, Value};

/// Lex, parse and validate `text` into a [`Script`].
///
/// Nothing is executed; the first failure of any stage is returned.
pub fn compile(text: &str) -> Result<Script, SyntaxError> {
    let tokens = lexer::tokenize(text)?;
    let token_count = tokens.len();
    let nodes = parser::parse(tokens, text)?;
    semantic_validator::validate_script(&nodes)?;

    let hash = hash_source(text);
    debug!(
        hash = &hash[..12],
        tokens = token_count,
        statements = nodes.len(),
        "compiled script"
    );
    Ok(Script { hash, nodes })
}

/// Hash script text using SHA256, lowercase hex
pub fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
