//! Rule: Duplicate Function
//!
//! Function definitions are hoisted per statement list, so two definitions
//! with the same name in one list would silently shadow each other.

use std::collections::HashMap;

use crate::interpreter::errors::SyntaxCategory;
use crate::interpreter::types::{Node, NodeKind};

use super::super::{ValidationError, ValidationRule};

pub struct DuplicateFunctionRule;

impl ValidationRule for DuplicateFunctionRule {
    fn id(&self) -> &'static str {
        "duplicate-function"
    }

    fn description(&self) -> &'static str {
        "at most one function definition per name in a statement list"
    }

    fn validate(&self, nodes: &[Node]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check(nodes, &mut errors, self.id());
        errors
    }
}

fn check(nodes: &[Node], errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        if let NodeKind::FunctionDef { name, .. } = &node.kind {
            if let Some(first) = seen.insert(name.as_str(), node.line) {
                errors.push(ValidationError::new(
                    node.line,
                    SyntaxCategory::Structure,
                    format!("function '{}' is already defined at line {}", name, first),
                    "rename or remove one of the definitions",
                    rule_id,
                ));
            }
        }
        check(&node.children, errors, rule_id);
    }
}
