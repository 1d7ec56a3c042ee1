//! Rule: Block Structure
//!
//! Every node's `structure` must match its kind, line nodes carry no
//! children, and the composite statements have the expected child kinds:
//!
//! - `If` holds one or more `Branch` nodes, optionally followed by one `Else`
//! - `Switch` holds `Case` nodes, optionally followed by one `Default`
//! - `Branch`/`Else` appear only under `If`, `Case`/`Default` only under `Switch`

use crate::interpreter::errors::SyntaxCategory;
use crate::interpreter::types::{Node, NodeKind, Structure};

use super::super::{ValidationError, ValidationRule};

pub struct BlockStructureRule;

impl ValidationRule for BlockStructureRule {
    fn id(&self) -> &'static str {
        "block-structure"
    }

    fn description(&self) -> &'static str {
        "node structure matches its kind and composite statements hold the right children"
    }

    fn validate(&self, nodes: &[Node]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        check_list(nodes, &mut errors, self.id());
        errors
    }
}

/// A plain statement list: no arm nodes allowed directly in it
fn check_list(nodes: &[Node], errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    for node in nodes {
        if is_arm(&node.kind) {
            errors.push(error(
                node,
                format!("'{}' must appear directly inside {}", node.name(), arm_owner(&node.kind)),
                rule_id,
            ));
            continue;
        }
        check_node(node, errors, rule_id);
    }
}

fn check_node(node: &Node, errors: &mut Vec<ValidationError>, rule_id: &'static str) {
    let expected = node.kind.structure();
    if node.structure != expected {
        errors.push(error(
            node,
            format!("'{}' must be a {:?} node, found {:?}", node.name(), expected, node.structure),
            rule_id,
        ));
        return;
    }
    if expected == Structure::Line {
        if !node.children.is_empty() {
            errors.push(error(
                node,
                format!("line statement '{}' cannot have children", node.name()),
                rule_id,
            ));
        }
        return;
    }

    match &node.kind {
        NodeKind::If => check_arms(node, is_branch, is_else, "If", "Branch", "Else", errors, rule_id),
        NodeKind::Switch { .. } => {
            check_arms(node, is_case, is_default, "Switch", "Case", "Default", errors, rule_id)
        }
        _ => check_list(&node.children, errors, rule_id),
    }
}

/// `owner` holds `head` arms, optionally closed by one trailing `tail` arm
#[allow(clippy::too_many_arguments)]
fn check_arms(
    owner: &Node,
    head: fn(&NodeKind) -> bool,
    tail: fn(&NodeKind) -> bool,
    owner_name: &str,
    head_name: &str,
    tail_name: &str,
    errors: &mut Vec<ValidationError>,
    rule_id: &'static str,
) {
    if owner_name == "If" && !owner.children.first().is_some_and(|c| head(&c.kind)) {
        errors.push(error(
            owner,
            format!("'{}' must start with a {}", owner_name, head_name),
            rule_id,
        ));
    }

    let last = owner.children.len().saturating_sub(1);
    for (i, child) in owner.children.iter().enumerate() {
        if head(&child.kind) || (tail(&child.kind) && i == last) {
            check_node(child, errors, rule_id);
        } else if tail(&child.kind) {
            errors.push(error(
                child,
                format!("'{}' must be the last arm of '{}'", tail_name, owner_name),
                rule_id,
            ));
        } else {
            errors.push(error(
                child,
                format!(
                    "'{}' may only contain {} and {} nodes, found '{}'",
                    owner_name,
                    head_name,
                    tail_name,
                    child.name()
                ),
                rule_id,
            ));
        }
    }
}

fn is_branch(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Branch { .. })
}

fn is_else(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Else)
}

fn is_case(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Case { .. })
}

fn is_default(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Default)
}

fn is_arm(kind: &NodeKind) -> bool {
    is_branch(kind) || is_else(kind) || is_case(kind) || is_default(kind)
}

fn arm_owner(kind: &NodeKind) -> &'static str {
    if is_branch(kind) || is_else(kind) {
        "'If'"
    } else {
        "'Switch'"
    }
}

fn error(node: &Node, message: String, rule_id: &'static str) -> ValidationError {
    ValidationError::new(
        node.line,
        SyntaxCategory::Structure,
        message,
        "rebuild the statement from source instead of editing the AST by hand",
        rule_id,
    )
}
