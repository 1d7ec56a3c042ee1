//! Tests for scope chain behavior during a run

use super::helpers::*;
use crate::interpreter::context::HostContext;
use crate::interpreter::errors::RuntimeErrorKind;
use crate::interpreter::types::Value;

#[test]
fn test_assignment_updates_nearest_binding() {
    let source = r#"
        declare total = 0
        for i in 1..3 {
            if (true) {
                total = total + i
            }
        }
        export total
    "#;
    assert_eq!(export_of(source), Some(Value::Int(6)));
}

#[test]
fn test_undeclared_assignment_binds_in_current_block() {
    let source = r#"
        if (true) {
            fresh = 1
        }
        export fresh
    "#;
    let err = runtime_error_of(source);
    assert_kind(&err, RuntimeErrorKind::UndefinedVariable);
}

#[test]
fn test_iterations_get_fresh_scopes() {
    let source = r#"
        for i in 1..3 {
            declare seen
            if (i == 1) {
                seen = "first"
            }
            echo isNull(seen)
        }
    "#;
    assert_eq!(run_script(source).echoed, vec!["false", "true", "true"]);
}

#[test]
fn test_function_params_shadow_globals() {
    let source = r#"
        declare x = "global"
        function show(x) {
            echo x
        }
        show("param")
        echo x
    "#;
    assert_eq!(run_script(source).echoed, vec!["param", "global"]);
}

#[test]
fn test_host_containers_are_copied_into_run() {
    let host = HostContext::new().with("items", Value::List(vec![Value::Int(1)]));
    let source = "items = items + [2]\nexport len(items)";
    let outcome = run_with(source, &host, None);
    assert_eq!(outcome.export(), Some(Value::Int(2)));
    assert_eq!(host.get("items"), Some(&Value::List(vec![Value::Int(1)])));
}

#[test]
fn test_thread_factory_name_binding_is_readable() {
    let host = HostContext::new().with("threadFactoryName", "io");
    let outcome = run_with("export $threadFactoryName", &host, None);
    assert_eq!(outcome.export(), Some(Value::str("io")));
}

#[test]
fn test_loop_declaration_shadows_outer_variable() {
    let source = r#"
        declare x = 1
        for i in 1..2 {
            declare x = 99
        }
        export x
    "#;
    assert_eq!(export_of(source), Some(Value::Int(1)));
}
