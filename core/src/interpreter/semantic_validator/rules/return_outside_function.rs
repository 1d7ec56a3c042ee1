//! Rule: Return Outside Function
//!
//! Scripts hand values back to the host with `export`; `return` only ends a
//! user function.

use crate::interpreter::errors::SyntaxCategory;
use crate::interpreter::types::{Node, NodeKind};

use super::super::{ValidationError, ValidationRule};

pub struct ReturnOutsideFunctionRule;

impl ValidationRule for ReturnOutsideFunctionRule {
    fn id(&self) -> &'static str {
        "return-outside-function"
    }

    fn description(&self) -> &'static str {
        "return only inside a function body"
    }

    fn validate(&self, nodes: &[Node]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check(nodes, false, &mut errors, self.id());
        errors
    }
}

fn check(nodes: &[Node], in_function: bool, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    for node in nodes {
        match &node.kind {
            NodeKind::Return { .. } if !in_function => {
                errors.push(ValidationError::new(
                    node.line,
                    SyntaxCategory::ControlFlow,
                    "'return' outside of a function",
                    "use `export value` to hand a result back to the host",
                    rule_id,
                ));
            }
            NodeKind::FunctionDef { .. } => check(&node.children, true, errors, rule_id),
            _ => check(&node.children, in_function, errors, rule_id),
        }
    }
}
