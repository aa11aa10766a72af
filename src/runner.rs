//! Running one external-command segment as a plain subprocess.
//!
//! The command text is handed to the configured shell argv template as its
//! final argument. The child's standard output is captured and normalized to
//! an ordered sequence of lines; standard error goes straight to the user's
//! screen.

use log::debug;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("shell template is empty")]
    EmptyTemplate,
    #[error("failed to launch {command}: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What one external command produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    pub lines: Vec<String>,
    pub status: i32,
    pub used_pty: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Split captured output into lines. A trailing newline does not produce a
/// phantom empty line; empty output is an empty vec.
pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(String::from)
        .collect()
}

/// Run `command_text` under the shell argv template, feeding `input` (if any)
/// to the child's standard input.
pub fn run(
    shell_argv: &[String],
    command_text: &str,
    input: Option<&str>,
) -> Result<ProcessResult, RunnerError> {
    let (program, args) = shell_argv.split_first().ok_or(RunnerError::EmptyTemplate)?;
    debug!("spawn {:?} {:?} <- {}", program, args, command_text);

    let mut child = Command::new(program)
        .args(args)
        .arg(command_text)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| RunnerError::Launch {
            command: command_text.to_string(),
            source,
        })?;

    // Feed stdin from its own thread so a child that interleaves reading
    // and writing (cat, sort, any filter) never wedges against a full
    // stdout pipe while we are still pushing input.
    let feeder = match (input, child.stdin.take()) {
        (Some(text), Some(mut stdin)) => {
            let payload = text.to_string();
            Some(std::thread::spawn(move || {
                // A child that exits without draining its input closes the
                // pipe early; that is its business, not an error here.
                let _ = stdin.write_all(payload.as_bytes());
            }))
        }
        _ => None,
    };

    let output = child.wait_with_output()?;
    if let Some(feeder) = feeder {
        let _ = feeder.join();
    }
    Ok(ProcessResult {
        lines: split_lines(&output.stdout),
        status: output.status.code().unwrap_or(-1),
        used_pty: false,
    })
}
