//! Parser tests - verify statement rules and AST structure
//!
//! These tests do NOT execute anything; execution is covered by the executor tests.

use crate::interpreter::errors::SyntaxCategory;
use crate::interpreter::lexer::tokenize;
use crate::interpreter::parser::parse;
use crate::interpreter::types::{Iterable, Node, NodeKind, Rhs, Structure};

fn parse_source(source: &str) -> Vec<Node> {
    let tokens = tokenize(source).expect("Should tokenize");
    parse(tokens, source).expect("Should parse")
}

fn parse_error(source: &str) -> crate::interpreter::errors::SyntaxError {
    let tokens = tokenize(source).expect("Should tokenize");
    parse(tokens, source).expect_err("Should fail to parse")
}

/* ===================== Line Statements ===================== */

#[test]
fn test_parse_import_with_default_alias() {
    let nodes = parse_source("import com.acme.tools.HttpTool");
    assert_eq!(nodes.len(), 1);
    match &nodes[0].kind {
        NodeKind::Import { path, alias } => {
            assert_eq!(path, "com.acme.tools.HttpTool");
            assert_eq!(alias, "HttpTool");
        }
        other => panic!("Expected Import, got {:?}", other),
    }
}

#[test]
fn test_parse_import_with_alias() {
    let nodes = parse_source("import com.acme.Fetcher as fetch");
    match &nodes[0].kind {
        NodeKind::Import { alias, .. } => assert_eq!(alias, "fetch"),
        other => panic!("Expected Import, got {:?}", other),
    }
}

#[test]
fn test_parse_declare_forms() {
    let nodes = parse_source("declare a\ndeclare b: int = 1 + 2\ndeclare c = run fetch(a, 2)");
    assert_eq!(nodes.len(), 3);

    match &nodes[0].kind {
        NodeKind::Declare {
            name,
            declared_type,
            value,
        } => {
            assert_eq!(name, "a");
            assert!(declared_type.is_none());
            assert!(value.is_none());
        }
        other => panic!("Expected Declare, got {:?}", other),
    }

    match &nodes[1].kind {
        NodeKind::Declare {
            declared_type: Some(t),
            value: Some(Rhs::Expr { expr }),
            ..
        } => {
            assert_eq!(t, "int");
            assert_eq!(expr.source, "1 + 2");
        }
        other => panic!("Expected typed Declare, got {:?}", other),
    }

    match &nodes[2].kind {
        NodeKind::Declare {
            value: Some(Rhs::Run { call }),
            ..
        } => {
            assert_eq!(call.name, "fetch");
            let args: Vec<&str> = call.args.iter().map(|a| a.source.as_str()).collect();
            assert_eq!(args, vec!["a", "2"]);
        }
        other => panic!("Expected Declare with run, got {:?}", other),
    }
    assert_eq!(nodes[2].line, 3);
}

#[test]
fn test_parse_invoke_vs_expression_rhs() {
    let nodes = parse_source("x = square(3)\ny = square(3) + 1");
    match &nodes[0].kind {
        NodeKind::Assign {
            value: Rhs::Invoke { call, source },
            ..
        } => {
            assert_eq!(call.name, "square");
            assert_eq!(source.source, "square(3)");
        }
        other => panic!("Expected Invoke, got {:?}", other),
    }
    match &nodes[1].kind {
        NodeKind::Assign {
            value: Rhs::Expr { expr },
            ..
        } => assert_eq!(expr.source, "square(3) + 1"),
        other => panic!("Expected Expr, got {:?}", other),
    }
}

#[test]
fn test_parse_nested_call_arguments() {
    let nodes = parse_source("run http.get(join(a, b), [1, 2], (3 + 4))");
    match &nodes[0].kind {
        NodeKind::Run { call } => {
            assert_eq!(call.name, "http.get");
            let args: Vec<&str> = call.args.iter().map(|a| a.source.as_str()).collect();
            assert_eq!(args, vec!["join(a, b)", "[1, 2]", "(3 + 4)"]);
        }
        other => panic!("Expected Run, got {:?}", other),
    }
}

#[test]
fn test_parse_export_and_echo() {
    let nodes = parse_source("echo \"hi\"; export 2 + 3 * 4");
    assert_eq!(nodes.len(), 2);
    assert!(matches!(&nodes[0].kind, NodeKind::Echo { value } if value.source == "\"hi\""));
    assert!(matches!(&nodes[1].kind, NodeKind::Export { value } if value.source == "2 + 3 * 4"));
}

#[test]
fn test_parse_task_block() {
    let source = r#"task results {
    user: fetchUser(id)
    "order-list": fetchOrders(id, 10), total: sum(1, 2)
}"#;
    let nodes = parse_source(source);
    match &nodes[0].kind {
        NodeKind::Task { target, tasks } => {
            assert_eq!(target, "results");
            let keys: Vec<&str> = tasks.iter().map(|t| t.key.as_str()).collect();
            assert_eq!(keys, vec!["user", "order-list", "total"]);
            assert_eq!(tasks[0].line, 2);
            assert_eq!(tasks[1].call.args.len(), 2);
        }
        other => panic!("Expected Task, got {:?}", other),
    }
    assert_eq!(nodes[0].structure, Structure::Line);
}

#[test]
fn test_parse_task_duplicate_key() {
    let err = parse_error("task r {\n a: f()\n a: g()\n}");
    assert_eq!(err.category, SyntaxCategory::Statement);
    assert!(err.message.contains("duplicate task key"));
}

/* ===================== Block Statements ===================== */

#[test]
fn test_parse_if_else_chain() {
    let source = r#"if (x > 1) {
    echo "big"
}
else if (x == 1) {
    echo "one"
} else {
    echo "small"
}"#;
    let nodes = parse_source(source);
    assert_eq!(nodes.len(), 1);
    let if_node = &nodes[0];
    assert!(matches!(if_node.kind, NodeKind::If));
    assert_eq!(if_node.structure, Structure::Block);

    let names: Vec<&str> = if_node.children.iter().map(Node::name).collect();
    assert_eq!(names, vec!["Branch", "Branch", "Else"]);
    assert_eq!(if_node.children[1].line, 4);
    match &if_node.children[1].kind {
        NodeKind::Branch { condition } => assert_eq!(condition.source, "x == 1"),
        other => panic!("Expected Branch, got {:?}", other),
    }
    assert_eq!(if_node.children[2].children.len(), 1);
}

#[test]
fn test_parse_switch() {
    let source = r#"switch (kind) {
    case "a": echo 1
        echo 2
    case "b":
    default: echo 3
}"#;
    let nodes = parse_source(source);
    let switch = &nodes[0];
    match &switch.kind {
        NodeKind::Switch { subject } => assert_eq!(subject.source, "kind"),
        other => panic!("Expected Switch, got {:?}", other),
    }
    let names: Vec<&str> = switch.children.iter().map(Node::name).collect();
    assert_eq!(names, vec!["Case", "Case", "Default"]);
    assert_eq!(switch.children[0].children.len(), 2);
    assert!(switch.children[1].children.is_empty());
}

#[test]
fn test_parse_for_ranges() {
    let nodes = parse_source("for i in 1..3 { }\nfor j in 0..<len(items) { }\nfor k in items { }");

    match &nodes[0].kind {
        NodeKind::For {
            var,
            iterable: Iterable::Range {
                start,
                end,
                inclusive,
            },
        } => {
            assert_eq!(var, "i");
            assert_eq!(start.source, "1");
            assert_eq!(end.source, "3");
            assert!(*inclusive);
        }
        other => panic!("Expected inclusive range, got {:?}", other),
    }

    match &nodes[1].kind {
        NodeKind::For {
            iterable: Iterable::Range { end, inclusive, .. },
            ..
        } => {
            assert_eq!(end.source, "len(items)");
            assert!(!*inclusive);
        }
        other => panic!("Expected exclusive range, got {:?}", other),
    }

    assert!(matches!(
        &nodes[2].kind,
        NodeKind::For { iterable: Iterable::Each { expr }, .. } if expr.source == "items"
    ));
}

#[test]
fn test_parse_while_with_loop_control() {
    let nodes = parse_source("while (true) {\n  if (a) { break }\n  continue\n  breakAll\n}");
    let body = &nodes[0].children;
    assert_eq!(body.len(), 3);
    assert!(matches!(body[0].children[0].children[0].kind, NodeKind::Break));
    assert!(matches!(body[1].kind, NodeKind::Continue));
    assert!(matches!(body[2].kind, NodeKind::BreakAll));
}

#[test]
fn test_parse_function_definition() {
    let nodes = parse_source("function add(a, b) {\n  return a + b\n}\nadd(1, 2)");
    match &nodes[0].kind {
        NodeKind::FunctionDef { name, params } => {
            assert_eq!(name, "add");
            assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("Expected FunctionDef, got {:?}", other),
    }
    assert!(matches!(
        &nodes[0].children[0].kind,
        NodeKind::Return { value: Some(v) } if v.source == "a + b"
    ));
    assert!(matches!(&nodes[1].kind, NodeKind::Call { call } if call.name == "add"));
}

#[test]
fn test_parse_bare_return() {
    let nodes = parse_source("function f() { return }");
    assert!(matches!(nodes[0].children[0].kind, NodeKind::Return { value: None }));
}

/* ===================== Errors ===================== */

#[test]
fn test_unrecognized_statement() {
    let err = parse_error("declare x = 1\n42 + x");
    assert_eq!(err.line, 2);
    assert_eq!(err.category, SyntaxCategory::Statement);
    assert!(err.context.contains("»42«"));
    assert!(err.suggestion.contains("declare"));
}

#[test]
fn test_system_name_cannot_be_assigned() {
    let err = parse_error("$preValue = 3");
    assert!(err.message.contains("reserved"));
}

#[test]
fn test_trailing_tokens_after_statement() {
    let err = parse_error("while (true) {\n  break 2\n}");
    assert_eq!(err.category, SyntaxCategory::Statement);
    assert_eq!(err.line, 2);
    assert!(err.message.contains("after break statement"));
}

#[test]
fn test_duplicate_parameter() {
    let err = parse_error("function f(a, a) { }");
    assert!(err.message.contains("duplicate parameter"));
}

#[test]
fn test_context_is_bounded() {
    let source = (0..40).map(|i| format!("x{} = {}", i, i)).collect::<Vec<_>>().join("; ") + "; ?";
    let err = parse_error(&source);
    let rendered = err.context.split(' ').count();
    assert!(rendered <= 20, "context too long: {}", err.context);
}

#[test]
fn test_ast_round_trips_through_json() {
    let nodes = parse_source("for i in 1..2 { if (i > 1) { echo i } }");
    let json = serde_json::to_string(&nodes).expect("AST serialization failed");
    let back: Vec<Node> = serde_json::from_str(&json).expect("AST deserialization failed");
    assert_eq!(back, nodes);
}
