//! Tests for if / else-if / else

use super::helpers::*;
use crate::interpreter::types::Value;

fn classify(x: i64) -> Option<Value> {
    let source = format!(
        r#"
        x = {}
        declare label
        if (x > 1) {{
            label = "big"
        }} else if (x == 1) {{
            label = "one"
        }} else {{
            label = "small"
        }}
        export label
    "#,
        x
    );
    export_of(&source)
}

#[test]
fn test_if_else_chain_picks_first_true_branch() {
    assert_eq!(classify(5), Some(Value::str("big")));
    assert_eq!(classify(1), Some(Value::str("one")));
    assert_eq!(classify(0), Some(Value::str("small")));
}

#[test]
fn test_if_without_else_and_false_condition() {
    let source = "hit = false\nif (0) {\n  hit = true\n}\nexport hit";
    assert_eq!(export_of(source), Some(Value::Bool(false)));
}

#[test]
fn test_truthiness_of_condition() {
    let source = r#"
        declare empty = []
        declare text = "x"
        hits = 0
        if (empty) { hits = hits + 1 }
        if (text) { hits = hits + 10 }
        export hits
    "#;
    assert_eq!(export_of(source), Some(Value::Int(10)));
}

#[test]
fn test_branch_declarations_do_not_leak() {
    let source = r#"
        declare v = "outer"
        if (true) {
            declare v = "inner"
            echo v
        }
        export v
    "#;
    let outcome = run_script(source);
    assert_eq!(outcome.echoed, vec!["inner"]);
    assert_eq!(outcome.export(), Some(Value::str("outer")));
}
