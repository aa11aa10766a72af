//! The command classifier and dispatcher.
//!
//! For each non-comment, non-empty segment of a line: try it as an
//! expression (failure is silent), then as a statement (an open block
//! accumulates across lines; a runtime error is reported and the value left
//! alone), and finally hand it to the external shell, which always handles
//! it one way or another.

use crate::pty;
use crate::runner::{self, ProcessResult, RunnerError};
use crate::script::{Completeness, Ctx, EvalError, Evaluated, RillEngine, ScriptEngine};
use crate::segment::split_line;
use crate::state::PipelineState;
use crate::namespace::Namespace;
use crate::value::Value;
use log::{debug, warn};

/// What the read loop needs to know after feeding one line in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStatus {
    /// A statement block or pipeline is still open; show the continuation
    /// prompt.
    pub incomplete: bool,
    /// The final segment produced a value worth printing.
    pub print: bool,
}

/// One interactive session: the pipeline state, the namespace, the injected
/// engine, and any statement text still waiting for its closing lines.
pub struct Session {
    pub state: PipelineState,
    pub ns: Namespace,
    engine: Box<dyn ScriptEngine>,
    pending: String,
}

impl Session {
    pub fn new(state: PipelineState) -> Self {
        Session::with_engine(state, Box::new(RillEngine::new()))
    }

    pub fn with_engine(state: PipelineState, engine: Box<dyn ScriptEngine>) -> Self {
        Session {
            state,
            ns: Namespace::new(),
            engine,
            pending: String::new(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.state.current
    }

    pub fn incomplete(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop any half-built statement without touching the pipeline value
    /// (Ctrl-C behavior).
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// End the current pipeline: drop any half-built statement, hand back
    /// the value for a final print, and start fresh.
    pub fn reset(&mut self) -> Value {
        self.pending.clear();
        let value = self.state.current.clone();
        self.state.commit(Value::Unset);
        value
    }

    /// Feed one physical line in. Errors are reported to the user here;
    /// only prompt and print decisions travel back to the caller.
    pub fn run_line(&mut self, line: &str) -> LineStatus {
        if self.incomplete() && line.trim().is_empty() {
            // Blank lines inside an open block are just vertical space.
            self.pending.push('\n');
            return LineStatus {
                incomplete: true,
                print: false,
            };
        }

        let segments = match split_line(line) {
            Ok(segments) => segments,
            Err(e) => {
                report(&e);
                return LineStatus::default();
            }
        };

        let count = segments.len();
        let mut status = LineStatus::default();
        for segment in &segments {
            let is_last = segment.index + 1 == count;
            if segment.is_comment() {
                continue;
            }
            if segment.is_empty() {
                if self.incomplete() {
                    // Explicit empty-segment terminator for an open block.
                    self.finish_block();
                    status.print = false;
                } else if is_last && count > 1 {
                    // Trailing bare pipe: the pipeline continues next line.
                    status.incomplete = true;
                    status.print = false;
                }
                continue;
            }

            if self.incomplete() {
                self.pending.push('\n');
                self.pending.push_str(segment.trimmed());
                match self.engine.check_complete(&self.pending) {
                    Completeness::Incomplete => {
                        status.incomplete = true;
                        status.print = false;
                    }
                    Completeness::Complete => {
                        self.finish_block();
                        status.incomplete = false;
                        status.print = false;
                    }
                    Completeness::Invalid(msg) => {
                        self.pending.clear();
                        report(&msg);
                        status.incomplete = false;
                        status.print = false;
                    }
                }
                continue;
            }

            status = self.classify(segment.trimmed(), is_last);
        }
        status
    }

    /// The three-way classification for one fresh segment.
    fn classify(&mut self, text: &str, is_last: bool) -> LineStatus {
        let mut ctx = Ctx {
            ns: &mut self.ns,
            state: &mut self.state,
        };
        match self.engine.evaluate(text, &mut ctx) {
            Ok(Evaluated::Value(value)) => {
                debug!("expression: {:?} -> {:?}", text, value);
                self.state.commit(value);
                return LineStatus {
                    incomplete: false,
                    print: is_last,
                };
            }
            Ok(Evaluated::Keep) => {
                debug!("expression (value-preserving): {:?}", text);
                return LineStatus::default();
            }
            Err(e) => {
                if self.state.debug {
                    if self.state.tracebacks {
                        eprintln!("rill: not an expression: {:?}", e);
                    } else {
                        eprintln!("rill: not an expression: {}", e);
                    }
                }
            }
        }

        match self.engine.check_complete(text) {
            Completeness::Incomplete => {
                self.pending = text.to_string();
                return LineStatus {
                    incomplete: true,
                    print: false,
                };
            }
            Completeness::Complete | Completeness::Invalid(_) => {}
        }

        let mut ctx = Ctx {
            ns: &mut self.ns,
            state: &mut self.state,
        };
        match self.engine.execute(text, &mut ctx) {
            Ok(()) => {
                debug!("statement: {:?}", text);
                return LineStatus::default();
            }
            Err(EvalError::Parse(e)) => {
                if self.state.debug {
                    eprintln!("rill: not a statement: {}", e);
                }
            }
            Err(e) => {
                // It parsed as a statement but blew up running; that is the
                // user's error to see, not the shell's command to guess at.
                if self.state.tracebacks {
                    eprintln!("rill: {:?}", e);
                } else {
                    report(&e);
                }
                return LineStatus::default();
            }
        }

        let print = self.run_external(text, is_last);
        LineStatus {
            incomplete: false,
            print,
        }
    }

    /// Run the accumulated block as a statement and clear it.
    fn finish_block(&mut self) {
        let text = std::mem::take(&mut self.pending);
        let mut ctx = Ctx {
            ns: &mut self.ns,
            state: &mut self.state,
        };
        match self.engine.execute(&text, &mut ctx) {
            Ok(()) => debug!("block: {:?}", text),
            Err(e) => {
                if self.state.tracebacks {
                    eprintln!("rill: {:?}", e);
                } else {
                    report(&e);
                }
            }
        }
    }

    /// External fallback; always produces a new pipeline value. Returns
    /// whether the captured output should be printed.
    fn run_external(&mut self, text: &str, is_last: bool) -> bool {
        let input = self.state.current.as_stdin();
        let result = self.spawn(text, input.as_deref(), is_last);
        match result {
            Ok(r) => {
                self.state.last_status = r.status;
                if !r.success() {
                    eprintln!("rill: command exited with status {}", r.status);
                }
                let print = is_last && !r.used_pty;
                self.state.commit(Value::Lines(r.lines));
                print
            }
            Err(e) => {
                report(&e);
                self.state.last_status = -1;
                self.state.commit(Value::Lines(Vec::new()));
                false
            }
        }
    }

    fn spawn(
        &mut self,
        text: &str,
        input: Option<&str>,
        is_last: bool,
    ) -> Result<ProcessResult, RunnerError> {
        if is_last && self.state.pty && pty::stdout_is_tty() {
            match pty::run(&self.state.shell_argv, text, input) {
                Ok(result) => return Ok(result),
                Err(e) => warn!("pty failed, using plain runner: {}", e),
            }
        }
        runner::run(&self.state.shell_argv, text, input)
    }
}

fn report(err: &dyn std::fmt::Display) {
    eprintln!("rill: {}", err);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut state = PipelineState::new();
        state.pty = false;
        state.shell_argv = vec!["/bin/sh".to_string(), "-c".to_string()];
        Session::new(state)
    }

    #[test]
    fn external_command_becomes_lines() {
        let mut s = session();
        let status = s.run_line("echo a b c");
        assert_eq!(s.value(), &Value::Lines(vec!["a b c".to_string()]));
        assert!(status.print);
        assert!(!status.incomplete);
    }

    #[test]
    fn silent_external_command_yields_empty_lines() {
        let mut s = session();
        s.run_line(":");
        assert_eq!(s.value(), &Value::Lines(vec![]));
        assert_eq!(s.state.last_status, 0);
    }

    #[test]
    fn bool_literal_is_an_expression_not_a_command() {
        // `true` is a language literal, so it never reaches the shell.
        let mut s = session();
        s.run_line("true");
        assert_eq!(s.value(), &Value::Bool(true));
    }

    #[test]
    fn expression_chain_threads_the_value() {
        let mut s = session();
        let status = s.run_line("-6 | abs(_) | _ * 6");
        assert_eq!(s.value(), &Value::Num(36.0));
        assert!(status.print);
    }

    #[test]
    fn external_feeds_the_next_expression() {
        let mut s = session();
        s.run_line("echo one two | len(_[0])");
        assert_eq!(s.value(), &Value::Num(7.0));
    }

    #[test]
    fn expression_feeds_the_next_external() {
        let mut s = session();
        s.run_line("'hello' | cat");
        assert_eq!(s.value(), &Value::Lines(vec!["hello".to_string()]));
    }

    #[test]
    fn statements_leave_the_value_alone() {
        let mut s = session();
        s.run_line("7");
        let status = s.run_line("x = 5");
        assert_eq!(s.value(), &Value::Num(7.0));
        assert!(!status.print);
        s.run_line("x * 2");
        assert_eq!(s.value(), &Value::Num(10.0));
    }

    #[test]
    fn raising_statement_keeps_value_and_primary_prompt() {
        let mut s = session();
        s.run_line("7");
        let status = s.run_line("x = 1 / 0");
        assert_eq!(s.value(), &Value::Num(7.0));
        assert!(!status.incomplete);
        assert_eq!(s.ns.get("x"), None);
    }

    #[test]
    fn multi_line_fn_accumulates_then_runs() {
        let mut s = session();
        let status = s.run_line("fn triple(n) {");
        assert!(status.incomplete);
        assert!(s.incomplete());
        let status = s.run_line("  return n * 3");
        assert!(status.incomplete);
        let status = s.run_line("}");
        assert!(!status.incomplete);
        assert!(!s.incomplete());
        s.run_line("3 | triple(_)");
        assert_eq!(s.value(), &Value::Num(9.0));
    }

    #[test]
    fn fn_block_closing_mid_line_continues_the_pipeline() {
        let mut s = session();
        s.run_line("fn double(n) {");
        let status = s.run_line("return n * 2 } | echo ok");
        assert!(!status.incomplete);
        assert_eq!(s.value(), &Value::Lines(vec!["ok".to_string()]));
        s.run_line("4 | double(_)");
        assert_eq!(s.value(), &Value::Num(8.0));
    }

    #[test]
    fn blank_line_keeps_a_block_open() {
        let mut s = session();
        s.run_line("fn noop(x) {");
        let status = s.run_line("");
        assert!(status.incomplete);
        s.run_line("return x");
        s.run_line("}");
        assert!(!s.incomplete());
    }

    #[test]
    fn empty_segment_terminates_an_open_block() {
        let mut s = session();
        s.run_line("fn f(x) {");
        // Abandons the half-built block (reported) and keeps going.
        let status = s.run_line("|| echo hi");
        assert!(!status.incomplete);
        assert!(!s.incomplete());
        assert_eq!(s.value(), &Value::Lines(vec!["hi".to_string()]));
    }

    #[test]
    fn interior_empty_segment_is_a_no_op() {
        let mut s = session();
        s.run_line("5 || _ + 1");
        assert_eq!(s.value(), &Value::Num(6.0));
    }

    #[test]
    fn trailing_pipe_marks_continuation() {
        let mut s = session();
        let status = s.run_line("5 |");
        assert!(status.incomplete);
        assert!(!status.print);
        assert_eq!(s.value(), &Value::Num(5.0));
        let status = s.run_line("| _ * 2");
        assert_eq!(s.value(), &Value::Num(10.0));
        assert!(status.print);
    }

    #[test]
    fn comments_are_no_ops() {
        let mut s = session();
        s.run_line("5");
        let status = s.run_line("# just a note");
        assert_eq!(s.value(), &Value::Num(5.0));
        assert!(!status.print);
        // A comment segment skips itself, not the rest of the line.
        s.run_line("5 | # note | _ + 1");
        assert_eq!(s.value(), &Value::Num(6.0));
    }

    #[test]
    fn failed_command_still_updates_the_value() {
        let mut s = session();
        s.run_line("5");
        s.run_line("exit 3");
        assert_eq!(s.value(), &Value::Lines(vec![]));
        assert_eq!(s.state.last_status, 3);
    }

    #[test]
    fn undo_builtin_restores_one_step() {
        let mut s = session();
        s.run_line("1");
        s.run_line("2");
        let status = s.run_line("undo()");
        assert_eq!(s.value(), &Value::Num(1.0));
        assert!(!status.print);
        s.run_line("undo()");
        assert_eq!(s.value(), &Value::Num(2.0));
    }

    #[test]
    fn reset_hands_back_the_value_and_clears() {
        let mut s = session();
        s.run_line("42");
        let last = s.reset();
        assert_eq!(last, Value::Num(42.0));
        assert_eq!(s.value(), &Value::Unset);
        assert!(!s.incomplete());
    }

    #[test]
    fn unterminated_quote_is_reported_not_fatal() {
        let mut s = session();
        s.run_line("5");
        let status = s.run_line("echo 'oops");
        assert_eq!(s.value(), &Value::Num(5.0));
        assert!(!status.incomplete);
    }
}
