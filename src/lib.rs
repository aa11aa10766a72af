//! rill - a pipeline shell that mixes expressions and commands
//!
//! # Overview
//!
//! rill reads lines made of `|`-separated segments. Every segment is tried,
//! in order, as an expression in a small embedded language, then as a
//! statement, and finally as an external command run under a shell. One
//! value threads through the whole pipeline; inside a segment it is spelled
//! `_`.
//!
//! ```text
//! >>> echo a b c          # external command; output becomes _ as lines
//! >>> -6 | abs(_) | _ * 6 # expressions over the threaded value
//! 36
//! >>> x = _               # statement; binds x, leaves _ untouched
//! >>> 'hello' | cat       # the value feeds the command's standard input
//! hello
//! ```
//!
//! Segments that produce a value replace `_`; statements and session calls
//! like `undo()` or `cd('dir')` leave it alone. External commands always
//! produce a list of output lines, even when they fail.
//!
//! # Example
//!
//! ```rust
//! use rill::{PipelineState, Session, Value};
//!
//! let mut state = PipelineState::new();
//! state.pty = false;
//! let mut session = Session::new(state);
//! session.run_line("-6 | abs(_) | _ * 6");
//! assert_eq!(session.value(), &Value::Num(36.0));
//! ```

pub mod dispatch;
pub mod namespace;
pub mod pty;
pub mod runner;
pub mod script;
pub mod segment;
pub mod signals;
pub mod state;
pub mod value;

// Re-export commonly used items
pub use dispatch::{LineStatus, Session};
pub use namespace::{FnDef, Namespace};
pub use runner::{ProcessResult, RunnerError};
pub use script::{Ctx, Evaluated, EvalError, RillEngine, ScriptEngine};
pub use segment::{split_line, Segment, SegmentError};
pub use state::PipelineState;
pub use value::Value;

/// Convenience function to run one line through a fresh session and hand
/// back the resulting pipeline value. External segments use the plain
/// runner, never a pty.
pub fn eval(input: &str) -> Value {
    let mut state = PipelineState::new();
    state.pty = false;
    let mut session = Session::new(state);
    session.run_line(input);
    session.reset()
}
