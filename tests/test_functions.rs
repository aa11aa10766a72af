//! Function definitions entered across lines, the way a REPL would feed
//! them in.

#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;
use common::{session, Value};

#[test]
fn multi_line_definition_then_call() {
    let mut s = session();
    assert!(s.run_line("fn triple(n) {").incomplete);
    assert!(s.run_line("    return n * 3").incomplete);
    assert!(!s.run_line("}").incomplete);
    s.run_line("echo a b c | wc -w | triple(num(_[0]))");
    assert_eq!(s.value(), &Value::Num(9.0));
}

#[test]
fn inline_definition() {
    let mut s = session();
    let status = s.run_line("fn double(n) { return n * 2 }");
    assert!(!status.incomplete);
    s.run_line("double(21)");
    assert_eq!(s.value(), &Value::Num(42.0));
}

#[test]
fn definition_closing_mid_pipeline() {
    let mut s = session();
    s.run_line("fn inc(n) {");
    s.run_line("return n + 1 } | 4 | inc(_)");
    assert_eq!(s.value(), &Value::Num(5.0));
}

#[test]
fn function_body_sees_session_bindings() {
    let mut s = session();
    s.run_line("rate = 10");
    s.run_line("fn scale(n) { return n * rate }");
    s.run_line("scale(3)");
    assert_eq!(s.value(), &Value::Num(30.0));
}

#[test]
fn body_runs_statements_before_return() {
    let mut s = session();
    s.run_line("fn area(w, h) {");
    s.run_line("    half = w * h / 2");
    s.run_line("    return half * 2");
    s.run_line("}");
    s.run_line("area(3, 4)");
    assert_eq!(s.value(), &Value::Num(12.0));
}

#[test]
fn runtime_error_in_a_statement_leaves_the_value() {
    let mut s = session();
    s.run_line("fn boom(n) { return n / 0 }");
    s.run_line("5");
    // Parses as a statement, fails running: reported, nothing changes.
    s.run_line("y = boom(1)");
    assert_eq!(s.value(), &Value::Num(5.0));
    assert_eq!(s.ns.get("y"), None);
}

#[test]
fn redefinition_replaces_the_old_body() {
    let mut s = session();
    s.run_line("fn f(n) { return n + 1 }");
    s.run_line("fn f(n) { return n + 2 }");
    s.run_line("f(0)");
    assert_eq!(s.value(), &Value::Num(2.0));
}
