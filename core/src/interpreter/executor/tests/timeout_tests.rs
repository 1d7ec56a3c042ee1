//! Tests for the cooperative run time limit

use std::time::Duration;

use super::helpers::*;
use crate::interpreter::context::HostContext;
use crate::interpreter::errors::NfError;
use crate::interpreter::types::Value;

#[test]
fn test_infinite_loop_times_out() {
    let source = "x = 0\nwhile (true) {\n  x = x + 1\n}";
    let outcome = run_with(source, &HostContext::new(), Some(Duration::from_millis(50)));
    match outcome.result {
        Err(NfError::Timeout { limit_ms, elapsed_ms, .. }) => {
            assert_eq!(limit_ms, 50);
            assert!(elapsed_ms >= 50);
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
}

#[test]
fn test_sleeping_task_trips_deadline_at_next_statement() {
    let source = "run sleep(30)\necho \"unreachable\"";
    let outcome = run_with(source, &HostContext::new(), Some(Duration::from_millis(10)));
    match outcome.result {
        Err(NfError::Timeout { line, .. }) => assert_eq!(line, 2),
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert!(outcome.echoed.is_empty());
}

#[test]
fn test_fast_script_within_limit() {
    let outcome = run_with("export 1", &HostContext::new(), Some(Duration::from_secs(5)));
    assert_eq!(outcome.export(), Some(Value::Int(1)));
}
