//! Tests for line statements: declare, assign, export, echo, import, run

use super::helpers::*;
use crate::interpreter::context::HostContext;
use crate::interpreter::errors::RuntimeErrorKind;
use crate::interpreter::types::Value;

#[test]
fn test_export_arithmetic() {
    assert_eq!(export_of("export 2 + 3 * 4"), Some(Value::Int(14)));
}

#[test]
fn test_no_export_is_none() {
    assert_eq!(export_of("declare x = 1"), None);
}

#[test]
fn test_last_export_wins() {
    assert_eq!(export_of("export 1\nexport \"two\""), Some(Value::str("two")));
}

#[test]
fn test_declare_without_value_is_null() {
    assert_eq!(export_of("declare x\nexport isNull(x)"), Some(Value::Bool(true)));
}

#[test]
fn test_assign_undeclared_creates_binding() {
    let source = r#"
        total = 10
        total = total + 5
        export total
    "#;
    assert_eq!(export_of(source), Some(Value::Int(15)));
}

#[test]
fn test_echo_goes_to_logger() {
    let outcome = run_script("declare name = \"nf\"\necho \"hello \" + name\necho [1, 2]");
    assert_eq!(outcome.echoed, vec!["hello nf", "[1, 2]"]);
}

#[test]
fn test_import_binds_type_handle() {
    let source = "import com.acme.tools.HttpTool as http\nexport typeOf(http)";
    assert_eq!(export_of(source), Some(Value::str("type")));
}

#[test]
fn test_run_task_with_args() {
    let source = "declare doubled = run double(21)\nexport doubled";
    assert_eq!(export_of(source), Some(Value::Int(42)));
}

#[test]
fn test_run_through_import_alias() {
    let source = "import double as twice\ndeclare v = run twice(4)\nexport v";
    assert_eq!(export_of(source), Some(Value::Int(8)));
}

#[test]
fn test_invoke_falls_back_to_builtin() {
    let source = "n = len([1, 2, 3])\nexport n";
    assert_eq!(export_of(source), Some(Value::Int(3)));
}

#[test]
fn test_invoke_prefers_task_over_builtin_lookup() {
    let source = "n = double(5)\nexport n";
    assert_eq!(export_of(source), Some(Value::Int(10)));
}

#[test]
fn test_host_values_are_visible() {
    let host = HostContext::new()
        .with("preValue", 5)
        .with("params", Value::List(vec![Value::Int(1), Value::Int(2)]))
        .with("user", "ada");
    let outcome = run_with("export [$preValue, len($params), user]", &host, None);
    assert_eq!(
        outcome.export(),
        Some(Value::List(vec![Value::Int(5), Value::Int(2), Value::str("ada")]))
    );
}

#[test]
fn test_declared_type_checked() {
    let err = runtime_error_of("declare n: int = \"seven\"");
    assert_kind(&err, RuntimeErrorKind::Type);
    assert_eq!(err.line, 1);

    let err = runtime_error_of("declare n: int = 1\nn = \"seven\"");
    assert_kind(&err, RuntimeErrorKind::Type);
    assert_eq!(err.line, 2);
}

#[test]
fn test_unknown_declared_type_accepted() {
    let source = "declare client: com.acme.Client = \"stub\"\nexport client";
    assert_eq!(export_of(source), Some(Value::str("stub")));
}
