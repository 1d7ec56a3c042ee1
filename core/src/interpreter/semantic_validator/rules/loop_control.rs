//! Rule: Loop Control
//!
//! `break`, `breakAll` and `continue` are legal only when some ancestor is a
//! `for` or `while`. Function bodies start a fresh frame: a loop around a
//! function definition does not make `break` inside the function legal.
//!
//! # Invalid
//!
//! ```text
//! break
//! for i in 1..3 { function f() { continue } }
//! ```

use crate::interpreter::errors::SyntaxCategory;
use crate::interpreter::types::{Node, NodeKind};

use super::super::{ValidationError, ValidationRule};

pub struct LoopControlRule;

impl ValidationRule for LoopControlRule {
    fn id(&self) -> &'static str {
        "loop-control"
    }

    fn description(&self) -> &'static str {
        "break, breakAll and continue only inside for/while loops"
    }

    fn validate(&self, nodes: &[Node]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check(nodes, false, &mut errors, self.id());
        errors
    }
}

fn check(nodes: &[Node], in_loop: bool, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    for node in nodes {
        if node.kind.is_loop_control() && !in_loop {
            errors.push(ValidationError::new(
                node.line,
                SyntaxCategory::ControlFlow,
                format!("'{}' outside of a loop", keyword(&node.kind)),
                "use break/breakAll/continue only inside a for or while body",
                rule_id,
            ));
        }

        let child_in_loop = match &node.kind {
            NodeKind::FunctionDef { .. } => false,
            kind if kind.is_loop() => true,
            _ => in_loop,
        };
        check(&node.children, child_in_loop, errors, rule_id);
    }
}

fn keyword(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Break => "break",
        NodeKind::BreakAll => "breakAll",
        _ => "continue",
    }
}
