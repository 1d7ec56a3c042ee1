//! Tests for `task` fan-out blocks

use maplit::btreemap;

use super::helpers::*;
use crate::interpreter::context::HostContext;
use crate::interpreter::errors::RuntimeErrorKind;
use crate::interpreter::types::Value;

#[test]
fn test_task_block_merges_results_by_key() {
    let source = r#"
        declare base = 10
        task results {
            first: double(base)
            second: double(base + 1), echoed: identity("x")
        }
        export results
    "#;
    assert_eq!(
        export_of(source),
        Some(Value::Map(btreemap! {
            "first".to_string() => Value::Int(20),
            "second".to_string() => Value::Int(22),
            "echoed".to_string() => Value::str("x"),
        }))
    );
}

#[test]
fn test_failed_sub_task_is_omitted() {
    let source = r#"
        task results {
            ok: double(1)
            bad: fail("nope")
            wrongType: double("one")
        }
        export keys(results)
    "#;
    assert_eq!(export_of(source), Some(Value::List(vec![Value::str("ok")])));
}

#[test]
fn test_panicking_sub_task_is_omitted() {
    let source = r#"
        task results {
            ok: identity(1)
            boom: explode()
        }
        echo "still running"
        export len(keys(results))
    "#;
    let outcome = run_script(source);
    assert_eq!(outcome.echoed, vec!["still running"]);
    assert_eq!(outcome.export(), Some(Value::Int(1)));
}

#[test]
fn test_unknown_sub_task_is_omitted() {
    let source = r#"
        task results {
            known: identity(1)
            unknown: noSuchTask()
        }
        export keys(results)
    "#;
    assert_eq!(export_of(source), Some(Value::List(vec![Value::str("known")])));
}

#[test]
fn test_argument_error_is_fatal() {
    let err = runtime_error_of("task results {\n  a: identity(missing)\n}");
    assert_kind(&err, RuntimeErrorKind::UndefinedVariable);
    assert_eq!(err.line, 2);
}

#[test]
fn test_all_sub_tasks_failing_yields_empty_map() {
    let source = "task results {\n  a: fail(1)\n}\nexport len(keys(results))";
    assert_eq!(export_of(source), Some(Value::Int(0)));
}

#[test]
fn test_task_block_uses_named_pool() {
    let host = HostContext::new().with("threadFactoryName", "io");
    let source = "task r {\n  where: threadName()\n}\nexport r.where";
    let outcome = run_with(source, &host, None);
    assert_eq!(outcome.export(), Some(Value::str("nf-io-0")));
}

#[test]
fn test_task_block_defaults_to_default_pool() {
    let source = "task r {\n  where: threadName()\n}\nexport r.where";
    match export_of(source) {
        Some(Value::Str(name)) => assert!(name.starts_with("nf-default-"), "ran on {}", name),
        other => panic!("Expected thread name, got {:?}", other),
    }
}

#[test]
fn test_task_target_reassigns_existing_binding() {
    let source = r#"
        declare results = "placeholder"
        if (true) {
            task results {
                a: identity(1)
            }
        }
        export results.a
    "#;
    assert_eq!(export_of(source), Some(Value::Int(1)));
}
