//! rill - a pipeline shell that mixes expressions and commands
//!
//! Usage:
//!   rill              Start interactive REPL
//!   rill -c "line"    Run a single line
//!   rill script.rill  Run a script file

mod cli;
mod rcfile;
mod repl;

use rill::{PipelineState, Session};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let opts = cli::parse_args(&args);

    if let Some(flag) = opts.unknown {
        eprintln!("rill: unknown option: {}", flag);
        eprintln!("Try 'rill --help' for usage");
        return ExitCode::from(2);
    }

    if opts.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if opts.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    // Environment first, flags on top.
    let mut state = PipelineState::new();
    if opts.debug {
        state.debug = true;
    }
    if opts.tracebacks {
        state.tracebacks = true;
        state.debug = true;
    }
    if opts.no_pty {
        state.pty = false;
    }
    if let Some(ref template) = opts.shell {
        state.set_shell(template);
    }

    let mut session = Session::new(state);

    if !opts.no_init {
        rcfile::load_init(&mut session);
    }

    // Run a single line
    if let Some(cmd) = opts.command {
        let status = session.run_line(&cmd);
        if status.print && !session.value().is_unset() {
            println!("{}", session.value().render());
        }
        let last = session.state.last_status;
        return if last == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(last.clamp(1, 255) as u8)
        };
    }

    // Run a script file
    if let Some(script) = opts.script {
        return rcfile::run_script(&mut session, &script);
    }

    // Start REPL
    let ps1 = opts.ps1.as_deref().unwrap_or(">>> ");
    let ps2 = opts.ps2.as_deref().unwrap_or("... ");
    match repl::run_repl(session, ps1, ps2) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rill: {}", e);
            ExitCode::FAILURE
        }
    }
}
