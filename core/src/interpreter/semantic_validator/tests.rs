//! Tests for the semantic validation system

use super::*;
use crate::interpreter::lexer::tokenize;
use crate::interpreter::parser::parse;
use crate::interpreter::types::{Expr, NodeKind};

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse source and validate, returning errors
fn validate(source: &str) -> Vec<ValidationError> {
    let tokens = tokenize(source).expect("Tokenize should succeed");
    let nodes = parse(tokens, source).expect("Parse should succeed");
    validate_nodes(&nodes)
}

/// Check if errors contain a specific rule
fn has_rule(errors: &[ValidationError], rule_id: &str) -> bool {
    errors.iter().any(|e| e.rule_id == rule_id)
}

/// Get errors for a specific rule
fn for_rule<'a>(errors: &'a [ValidationError], rule_id: &str) -> Vec<&'a ValidationError> {
    errors.iter().filter(|e| e.rule_id == rule_id).collect()
}

// ============================================================================
// Loop Control Tests
// ============================================================================

#[test]
fn test_top_level_break_is_control_flow_error() {
    let errors = validate("declare x = 1\nbreak");
    let loop_errors = for_rule(&errors, "loop-control");
    assert_eq!(loop_errors.len(), 1);
    assert_eq!(loop_errors[0].line, 2);
    assert_eq!(loop_errors[0].category, SyntaxCategory::ControlFlow);

    let tokens = tokenize("break").expect("Tokenize should succeed");
    let nodes = parse(tokens, "break").expect("Parse should succeed");
    let err = validate_script(&nodes).expect_err("Validation should fail");
    assert_eq!(err.category, SyntaxCategory::ControlFlow);
}

#[test]
fn test_loop_control_inside_nested_blocks_ok() {
    let source = r#"
for i in 1..3 {
    if (i == 2) {
        switch (i) {
            case 2: continue
        }
    }
    while (true) { breakAll }
}
"#;
    assert!(validate(source).is_empty());
}

#[test]
fn test_loop_control_in_if_outside_loop() {
    let errors = validate("if (true) { continue }");
    assert!(has_rule(&errors, "loop-control"));
    assert!(errors[0].message.contains("continue"));
}

#[test]
fn test_function_body_resets_loop_frame() {
    let source = r#"
while (true) {
    function f() {
        break
    }
    break
}
"#;
    let errors = for_rule(&validate(source), "loop-control").len();
    assert_eq!(errors, 1);
}

// ============================================================================
// Return Tests
// ============================================================================

#[test]
fn test_return_outside_function() {
    let errors = validate("for i in 1..2 { return i }");
    let returns = for_rule(&errors, "return-outside-function");
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].category, SyntaxCategory::ControlFlow);
}

#[test]
fn test_return_inside_function_ok() {
    let source = r#"
function pick(x) {
    if (x > 1) { return x }
    return 0
}
"#;
    assert!(validate(source).is_empty());
}

// ============================================================================
// Duplicate Function Tests
// ============================================================================

#[test]
fn test_duplicate_function_same_list() {
    let errors = validate("function f() { }\nfunction g() { }\nfunction f() { }");
    let dupes = for_rule(&errors, "duplicate-function");
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].line, 3);
    assert!(dupes[0].message.contains("line 1"));
}

#[test]
fn test_same_name_in_different_lists_ok() {
    let errors = validate("function f() { }\nif (true) { function f() { } }");
    assert!(!has_rule(&errors, "duplicate-function"));
}

// ============================================================================
// Block Structure Tests
// ============================================================================

#[test]
fn test_parsed_scripts_are_well_formed() {
    let source = r#"
if (a) { echo 1 } else if (b) { echo 2 } else { echo 3 }
switch (a) { case 1: echo 1
default: echo 2 }
"#;
    assert!(!has_rule(&validate(source), "block-structure"));
}

#[test]
fn test_line_node_with_children() {
    let mut echo = Node::line(NodeKind::Echo { value: Expr::new("1") }, 1);
    echo.children.push(Node::line(NodeKind::Break, 2));
    let errors = validate_nodes(&[echo]);
    assert!(has_rule(&errors, "block-structure"));
    assert_eq!(errors[0].category, SyntaxCategory::Structure);
}

#[test]
fn test_structure_mismatch() {
    let node = Node::line(NodeKind::While { condition: Expr::new("true") }, 4);
    let errors = validate_nodes(&[node]);
    assert_eq!(for_rule(&errors, "block-structure").len(), 1);
    assert_eq!(errors[0].line, 4);
}

#[test]
fn test_else_must_be_last() {
    let branch = Node::block(NodeKind::Branch { condition: Expr::new("a") }, 1, vec![]);
    let if_node = Node::block(
        NodeKind::If,
        1,
        vec![branch.clone(), Node::block(NodeKind::Else, 2, vec![]), branch],
    );
    let errors = validate_nodes(&[if_node]);
    let structure = for_rule(&errors, "block-structure");
    assert_eq!(structure.len(), 1);
    assert!(structure[0].message.contains("last arm"));
}

#[test]
fn test_arm_outside_owner() {
    let case = Node::block(NodeKind::Case { value: Expr::new("1") }, 7, vec![]);
    let errors = validate_nodes(&[case]);
    assert!(errors[0].message.contains("'Switch'"));
}

#[test]
fn test_if_without_branch() {
    let if_node = Node::block(NodeKind::If, 1, vec![Node::block(NodeKind::Else, 1, vec![])]);
    let errors = validate_nodes(&[if_node]);
    assert!(errors.iter().any(|e| e.message.contains("must start with a Branch")));
}

#[test]
fn test_validation_error_converts_to_syntax_error() {
    let err = validate("continue")
        .into_iter()
        .next()
        .expect("Should report an error")
        .into_syntax_error();
    assert_eq!(err.line, 1);
    assert!(err.context.contains("loop-control"));
}

#[test]
fn test_validator_lists_rules() {
    let ids: Vec<&str> = Validator::new().rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec![
            "block-structure",
            "loop-control",
            "return-outside-function",
            "duplicate-function"
        ]
    );
}
