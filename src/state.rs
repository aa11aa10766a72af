//! Session-lived pipeline state.
//!
//! Holds the current pipeline value, exactly one previous value (for undo),
//! the debug/traceback observability flags, and the external-shell argv
//! template. Mutated only by the dispatcher after a segment completes.

use crate::value::Value;

pub const DEFAULT_SHELL: &[&str] = &["/bin/sh", "-c"];

#[derive(Debug, Clone)]
pub struct PipelineState {
    pub current: Value,
    pub previous: Value,
    /// Gates the classifier trace on stderr; never alters outcomes.
    pub debug: bool,
    /// Gates full error detail in the trace; never alters outcomes.
    pub tracebacks: bool,
    /// External-shell argv template; the command text is appended as the
    /// final argument.
    pub shell_argv: Vec<String>,
    /// Whether terminal-facing external commands get a pseudo-terminal.
    pub pty: bool,
    /// Exit status of the most recent external command.
    pub last_status: i32,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineState {
    /// Fresh state, configured from the environment.
    ///
    /// `RILL_SHELL` overrides the shell argv template (whitespace-split),
    /// `RILL_NO_PTY` disables pty allocation, `RILL_DEBUG` / `RILL_TRACEBACKS`
    /// set the initial observability flags.
    pub fn new() -> Self {
        PipelineState {
            current: Value::Unset,
            previous: Value::Unset,
            debug: std::env::var_os("RILL_DEBUG").is_some(),
            tracebacks: std::env::var_os("RILL_TRACEBACKS").is_some(),
            shell_argv: default_shell_argv(),
            pty: std::env::var_os("RILL_NO_PTY").is_none(),
            last_status: 0,
        }
    }

    /// Record a new pipeline value: `previous <- current; current <- new`.
    pub fn commit(&mut self, value: Value) {
        self.previous = std::mem::replace(&mut self.current, value);
    }

    /// Swap current and previous. Exactly one level: a second consecutive
    /// undo toggles back rather than walking further history.
    pub fn undo(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    pub fn toggle_debug(&mut self) {
        self.debug = !self.debug;
    }

    /// Turning tracebacks on also turns debug on, so the detail has
    /// somewhere to go. Turning them off leaves debug alone.
    pub fn toggle_tracebacks(&mut self) {
        self.tracebacks = !self.tracebacks;
        if self.tracebacks {
            self.debug = true;
        }
    }

    /// Replace the shell argv template (whitespace-split).
    pub fn set_shell(&mut self, template: &str) {
        let argv: Vec<String> = template.split_whitespace().map(String::from).collect();
        if !argv.is_empty() {
            self.shell_argv = argv;
        }
    }
}

fn default_shell_argv() -> Vec<String> {
    match std::env::var("RILL_SHELL") {
        Ok(template) if !template.trim().is_empty() => {
            template.split_whitespace().map(String::from).collect()
        }
        _ => DEFAULT_SHELL.iter().map(|s| s.to_string()).collect(),
    }
}
