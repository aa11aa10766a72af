//! Common test utilities for rill integration tests

pub use rill::{eval, PipelineState, Session, Value};

/// Session wired for tests: plain runner, /bin/sh
pub fn session() -> Session {
    let mut state = PipelineState::new();
    state.pty = false;
    state.shell_argv = vec!["/bin/sh".to_string(), "-c".to_string()];
    Session::new(state)
}

/// Lines value from plain strings
#[allow(dead_code)]
pub fn lines(items: &[&str]) -> Value {
    Value::Lines(items.iter().map(|s| s.to_string()).collect())
}
