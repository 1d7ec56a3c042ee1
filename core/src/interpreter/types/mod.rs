//! Type definitions shared by every stage of the NF pipeline
//!
//! - Tokens produced by the lexer (`Token`, `TokenKind`)
//! - AST nodes produced by the parser (`Node`, `NodeKind`, `Structure`)
//! - Runtime values (`Value`)
//! - Control flow outcomes (`Flow`)

pub mod ast;
pub mod control;
pub mod token;
pub mod values;

pub use ast::{CallSpec, Expr, Iterable, Node, NodeKind, Rhs, Script, Structure, TaskSpec};
pub use control::Flow;
pub use token::{Token, TokenKind};
pub use values::Value;
