use rill::Session;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Get home directory
pub(crate) fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn init_path() -> Option<PathBuf> {
    dirs_home().map(|h| h.join(".rillrc"))
}

/// Load and execute ~/.rillrc if it exists
pub(crate) fn load_init(session: &mut Session) {
    let path = match init_path() {
        Some(p) => p,
        None => return,
    };

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return,
    };

    run_source(session, &content, "~/.rillrc");
}

/// Feed source lines through the session, honoring multi-line function
/// blocks. Problems are reported by the dispatcher as they happen; loading
/// never aborts.
pub(crate) fn run_source(session: &mut Session, content: &str, source: &str) {
    for line in content.lines() {
        // Skip blank and comment-only lines when not inside a block; inside
        // a block they belong to the dispatcher.
        if !session.incomplete() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
        }
        session.run_line(line);
    }

    if session.incomplete() {
        eprintln!("Warning: {}: unterminated block at end of input", source);
        session.clear_pending();
    }
}

/// Execute a script file, printing the final pipeline value
pub(crate) fn run_script(session: &mut Session, path: &str) -> ExitCode {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("rill: cannot read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    run_source(session, &content, path);

    let last = session.reset();
    if !last.is_unset() {
        println!("{}", last.render());
    }

    let status = session.state.last_status;
    if status == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(status.clamp(1, 255) as u8)
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
    fn definitions_and_bindings_survive_loading() {
        let mut s = session();
        let content = "\
# defaults
greeting = 'hi'
fn double(n) {
    return n * 2
}
";
        run_source(&mut s, content, "test");
        assert!(!s.incomplete());
        s.run_line("double(21)");
        assert_eq!(s.value(), &Value::Num(42.0));
    }

    #[test]
    fn unterminated_block_is_dropped_with_a_warning() {
        let mut s = session();
        run_source(&mut s, "fn broken(n) {\n    return n\n", "test");
        assert!(!s.incomplete());
        // The session is still usable.
        s.run_line("1 + 1");
        assert_eq!(s.value(), &Value::Num(2.0));
    }

    #[test]
    fn blank_lines_outside_blocks_do_not_end_the_pipeline() {
        let mut s = session();
        run_source(&mut s, "x = 5\n\n\ny = 6\n", "test");
        s.run_line("x + y");
        assert_eq!(s.value(), &Value::Num(11.0));
    }
}
