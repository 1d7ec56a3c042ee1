//! Abstract Syntax Tree node types
//!
//! Every statement is a [`Node`]. Block-shaped statements keep their nested
//! statements in `children`; line statements never have children. Expressions
//! are stored as their exact source text and handed to the expression evaluator
//! at run time.

use serde::{Deserialize, Serialize};

/// Whether a node owns a nested statement list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    Line,
    Block,
}

/// Expression source text, evaluated lazily by an `ExpressionEvaluator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub source: String,
}

impl Expr {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// A named call with argument expressions: `fetch(user, 3)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpec {
    pub name: String,
    pub args: Vec<Expr>,
}

/// Right-hand side of a declaration or assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Rhs {
    /// Plain expression
    Expr { expr: Expr },
    /// `run tool(args)`: synchronous task call
    Run { call: CallSpec },
    /// `name(args)`: user function, then task, then evaluator builtin
    Invoke { call: CallSpec, source: Expr },
}

/// What a `for` loop walks over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Iterable {
    /// `a..b` (inclusive) or `a..<b` (exclusive)
    Range {
        start: Expr,
        end: Expr,
        inclusive: bool,
    },
    /// List elements, map keys or string characters
    Each { expr: Expr },
}

/// One entry of a `task` fan-out statement: `key: tool(args)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub key: String,
    pub call: CallSpec,
    pub line: usize,
}

/// Statement kind with its statement-specific payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum NodeKind {
    Import {
        path: String,
        alias: String,
    },
    Declare {
        name: String,
        declared_type: Option<String>,
        value: Option<Rhs>,
    },
    Assign {
        name: String,
        value: Rhs,
    },
    Run {
        call: CallSpec,
    },
    Task {
        target: String,
        tasks: Vec<TaskSpec>,
    },
    Export {
        value: Expr,
    },
    Echo {
        value: Expr,
    },
    /// Children are `Branch` nodes followed by an optional `Else`
    If,
    Branch {
        condition: Expr,
    },
    Else,
    /// Children are `Case` nodes followed by an optional `Default`
    Switch {
        subject: Expr,
    },
    Case {
        value: Expr,
    },
    Default,
    For {
        var: String,
        iterable: Iterable,
    },
    While {
        condition: Expr,
    },
    Break,
    BreakAll,
    Continue,
    Return {
        value: Option<Expr>,
    },
    FunctionDef {
        name: String,
        params: Vec<String>,
    },
    Call {
        call: CallSpec,
    },
}

impl NodeKind {
    /// Stable name used in error messages and monitor reports
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Import { .. } => "Import",
            NodeKind::Declare { .. } => "Declare",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Run { .. } => "Run",
            NodeKind::Task { .. } => "Task",
            NodeKind::Export { .. } => "Export",
            NodeKind::Echo { .. } => "Echo",
            NodeKind::If => "If",
            NodeKind::Branch { .. } => "Branch",
            NodeKind::Else => "Else",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Case { .. } => "Case",
            NodeKind::Default => "Default",
            NodeKind::For { .. } => "For",
            NodeKind::While { .. } => "While",
            NodeKind::Break => "Break",
            NodeKind::BreakAll => "BreakAll",
            NodeKind::Continue => "Continue",
            NodeKind::Return { .. } => "Return",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::Call { .. } => "Call",
        }
    }

    /// The structure a well-formed node of this kind must have
    pub fn structure(&self) -> Structure {
        match self {
            NodeKind::If
            | NodeKind::Branch { .. }
            | NodeKind::Else
            | NodeKind::Switch { .. }
            | NodeKind::Case { .. }
            | NodeKind::Default
            | NodeKind::For { .. }
            | NodeKind::While { .. }
            | NodeKind::FunctionDef { .. } => Structure::Block,
            _ => Structure::Line,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, NodeKind::For { .. } | NodeKind::While { .. })
    }

    pub fn is_loop_control(&self) -> bool {
        matches!(self, NodeKind::Break | NodeKind::BreakAll | NodeKind::Continue)
    }
}

/// A statement in the AST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub structure: Structure,
    /// 1-based source line of the statement's first token
    pub line: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Build a line statement
    pub fn line(kind: NodeKind, line: usize) -> Self {
        Self {
            kind,
            structure: Structure::Line,
            line,
            children: Vec::new(),
        }
    }

    /// Build a block statement owning `children`
    pub fn block(kind: NodeKind, line: usize, children: Vec<Node>) -> Self {
        Self {
            kind,
            structure: Structure::Block,
            line,
            children,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// A compiled (lexed, parsed and validated) script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// SHA-256 of the script text, lowercase hex
    pub hash: String,
    pub nodes: Vec<Node>,
}
