use rill::script::chdir;
use rill::{signals, Session};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};

use crate::rcfile::{dirs_home, load_init};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the interactive read-eval loop
pub(crate) fn run_repl(mut session: Session, ps1: &str, ps2: &str) -> RlResult<()> {
    signals::setup_signal_handlers();

    let mut rl = DefaultEditor::new()?;

    // Try to load history
    let history_path = dirs_home().map(|h| h.join(".rill_history"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    // Show banner only if RILL_BANNER is set
    if std::env::var("RILL_BANNER").is_ok() {
        println!("rill {} - pipelines over expressions, statements, and commands", VERSION);
        println!("  Type Ctrl-D to end the pipeline, Ctrl-D twice to quit");
    }

    // Consecutive Ctrl-D presses quit; anything in between disarms.
    let mut eof_armed = false;
    // Whether the current value was already printed by the last line.
    let mut just_printed = false;

    loop {
        let prompt = if session.incomplete() { ps2 } else { ps1 };

        match rl.readline(prompt) {
            Ok(line) => {
                eof_armed = false;
                let trimmed = line.trim();

                if !session.incomplete() {
                    // Blank line: re-show the current value without running
                    // anything.
                    if trimmed.is_empty() {
                        if !session.value().is_unset() {
                            println!("{}", session.value().render());
                        }
                        continue;
                    }

                    let _ = rl.add_history_entry(trimmed);

                    if trimmed == "exit" || trimmed == "quit" {
                        break;
                    }

                    if trimmed.starts_with('%') {
                        handle_directive(&mut session, trimmed);
                        just_printed = false;
                        continue;
                    }
                } else {
                    let _ = rl.add_history_entry(line.as_str());
                }

                let status = session.run_line(&line);
                if status.print && !session.value().is_unset() {
                    println!("{}", session.value().render());
                    just_printed = true;
                } else {
                    just_printed = false;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: abandon any half-built block, keep the value.
                session.clear_pending();
                eof_armed = false;
                continue;
            }
            Err(ReadlineError::Eof) => {
                if eof_armed {
                    break;
                }
                eof_armed = true;
                // Ctrl-D ends the pipeline: show the final value (unless the
                // last line already did) and start fresh.
                let last = session.reset();
                if !just_printed && !last.is_unset() {
                    println!("{}", last.render());
                }
                just_printed = false;
            }
            Err(err) => {
                eprintln!("rill: {:?}", err);
                break;
            }
        }
    }

    // Save history
    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

/// `%`-prefixed directives act on the session without touching the pipeline.
fn handle_directive(session: &mut Session, text: &str) {
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match head {
        "%cd" => {
            if let Err(e) = chdir(arg) {
                eprintln!("rill: cd: {}", e);
            }
        }
        "%d" => {
            session.state.toggle_debug();
            println!("debug {}", on_off(session.state.debug));
        }
        "%t" => {
            session.state.toggle_tracebacks();
            println!("tracebacks {}", on_off(session.state.tracebacks));
        }
        "%u" => {
            session.state.undo();
            if !session.value().is_unset() {
                println!("{}", session.value().render());
            }
        }
        "%r" => {
            load_init(session);
        }
        other => {
            eprintln!("rill: unknown directive: {}", other);
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill::{PipelineState, Value};

    fn session() -> Session {
        let mut state = PipelineState::new();
        state.pty = false;
        state.shell_argv = vec!["/bin/sh".to_string(), "-c".to_string()];
        Session::new(state)
    }

    #[test]
    fn undo_directive_swaps_values() {
        let mut s = session();
        s.run_line("5");
        s.run_line("6");
        handle_directive(&mut s, "%u");
        assert_eq!(s.value(), &Value::Num(5.0));
    }

    #[test]
    fn debug_directive_toggles() {
        let mut s = session();
        let before = s.state.debug;
        handle_directive(&mut s, "%d");
        assert_eq!(s.state.debug, !before);
    }

    #[test]
    fn unknown_directive_leaves_the_session_alone() {
        let mut s = session();
        s.run_line("5");
        handle_directive(&mut s, "%bogus");
        assert_eq!(s.value(), &Value::Num(5.0));
    }
}
