//! Tests for `for` and `while` loops and loop control

use maplit::btreemap;

use super::helpers::*;
use crate::interpreter::context::HostContext;
use crate::interpreter::errors::RuntimeErrorKind;
use crate::interpreter::types::Value;

#[test]
fn test_for_inclusive_range() {
    let source = r#"
        sum = 0
        for i in 1..3 {
            sum = sum + i
        }
        export sum
    "#;
    assert_eq!(export_of(source), Some(Value::Int(6)));
}

#[test]
fn test_for_exclusive_range() {
    let source = r#"
        sum = 0
        for i in 1..<3 {
            sum = sum + i
        }
        export sum
    "#;
    assert_eq!(export_of(source), Some(Value::Int(3)));
}

#[test]
fn test_for_descending_range_runs_zero_times() {
    let source = r#"
        count = 0
        for i in 3..1 {
            count = count + 1
        }
        export count
    "#;
    assert_eq!(export_of(source), Some(Value::Int(0)));
}

#[test]
fn test_for_range_bounds_must_be_ints() {
    let err = runtime_error_of("for i in 1..\"x\" {\n  echo i\n}");
    assert_kind(&err, RuntimeErrorKind::Type);
}

#[test]
fn test_for_each_list_map_and_string() {
    let host = HostContext::new().with(
        "m",
        Value::Map(btreemap! {
            "z".to_string() => Value::Int(1),
            "y".to_string() => Value::Int(2),
        }),
    );
    let source = r#"
        for item in [1, 2] {
            echo item
        }
        for key in m {
            echo key
        }
        for c in "hi" {
            echo c
        }
    "#;
    let outcome = run_with(source, &host, None);
    assert_eq!(outcome.echoed, vec!["1", "2", "y", "z", "h", "i"]);
}

#[test]
fn test_for_each_null_is_empty() {
    let source = r#"
        declare nothing
        count = 0
        for x in nothing {
            count = count + 1
        }
        export count
    "#;
    assert_eq!(export_of(source), Some(Value::Int(0)));
}

#[test]
fn test_for_each_rejects_scalars() {
    let err = runtime_error_of("for x in 42 {\n  echo x\n}");
    assert_kind(&err, RuntimeErrorKind::Type);
    assert!(err.message.contains("int"));
}

#[test]
fn test_loop_variable_is_scoped_to_the_loop() {
    let err = runtime_error_of("for i in 1..2 {\n  echo i\n}\nexport i");
    assert_kind(&err, RuntimeErrorKind::UndefinedVariable);
    assert_eq!(err.line, 4);
}

#[test]
fn test_while_counts() {
    let source = r#"
        i = 0
        while (i < 5) {
            i = i + 1
        }
        export i
    "#;
    assert_eq!(export_of(source), Some(Value::Int(5)));
}

#[test]
fn test_while_zero_iterations() {
    let source = r#"
        ran = false
        while (false) {
            ran = true
        }
        export ran
    "#;
    assert_eq!(export_of(source), Some(Value::Bool(false)));
}

#[test]
fn test_break_and_continue() {
    let source = r#"
        sum = 0
        for i in 1..10 {
            if (i == 3) { continue }
            if (i > 5) { break }
            sum = sum + i
        }
        export sum
    "#;
    // 1 + 2 + 4 + 5
    assert_eq!(export_of(source), Some(Value::Int(12)));
}

#[test]
fn test_break_only_leaves_inner_loop() {
    let source = r#"
        count = 0
        for i in 1..3 {
            for j in 1..3 {
                if (j == 2) { break }
                count = count + 1
            }
        }
        export count
    "#;
    assert_eq!(export_of(source), Some(Value::Int(3)));
}

#[test]
fn test_break_all_leaves_every_loop() {
    let source = r#"
        count = 0
        for i in 1..3 {
            for j in 1..3 {
                while (true) {
                    count = count + 1
                    breakAll
                }
            }
        }
        echo "after"
        export count
    "#;
    let outcome = run_script(source);
    assert_eq!(outcome.echoed, vec!["after"]);
    assert_eq!(outcome.export(), Some(Value::Int(1)));
}

#[test]
fn test_task_results_iterable_as_map() {
    let source = r#"
        task r {
            a: double(1)
            b: double(2)
        }
        total = 0
        for k in r {
            total = total + r[k]
        }
        export total
    "#;
    assert_eq!(export_of(source), Some(Value::Int(6)));
}
