const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command-line arguments
pub(crate) struct CliArgs {
    pub(crate) command: Option<String>,
    pub(crate) script: Option<String>,
    pub(crate) shell: Option<String>,
    pub(crate) ps1: Option<String>,
    pub(crate) ps2: Option<String>,
    pub(crate) debug: bool,
    pub(crate) tracebacks: bool,
    pub(crate) no_pty: bool,
    pub(crate) no_init: bool,
    pub(crate) help: bool,
    pub(crate) version: bool,
    pub(crate) unknown: Option<String>,
}

/// Parse command-line arguments
pub(crate) fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs {
        command: None,
        script: None,
        shell: None,
        ps1: None,
        ps2: None,
        debug: false,
        tracebacks: false,
        no_pty: false,
        no_init: false,
        help: false,
        version: false,
        unknown: None,
    };

    let mut i = 1; // Skip program name
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                // Everything after -c is the command
                if i + 1 < args.len() {
                    cli.command = Some(args[i + 1..].join(" "));
                    break;
                }
            }
            "-d" | "--debug" => {
                cli.debug = true;
            }
            "-t" | "--tracebacks" => {
                cli.tracebacks = true;
            }
            "--no-pty" => {
                cli.no_pty = true;
            }
            "--no-init" => {
                cli.no_init = true;
            }
            "--shell" => {
                if i + 1 < args.len() {
                    cli.shell = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--ps1" => {
                if i + 1 < args.len() {
                    cli.ps1 = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--ps2" => {
                if i + 1 < args.len() {
                    cli.ps2 = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                cli.help = true;
            }
            "--version" | "-V" => {
                cli.version = true;
            }
            path => {
                // Anything dash-prefixed we did not recognize is an error;
                // anything else is a script file.
                if path.starts_with('-') {
                    if cli.unknown.is_none() {
                        cli.unknown = Some(path.to_string());
                    }
                } else {
                    cli.script = Some(path.to_string());
                }
            }
        }
        i += 1;
    }

    cli
}

pub(crate) fn print_help() {
    println!(
        r#"rill {} - a pipeline shell that mixes expressions and commands

USAGE:
    rill                    Start interactive REPL
    rill -c <command>       Run a single line and exit
    rill <script.rill>      Run a script file
    rill --help             Show this help message
    rill --version          Show version

OPTIONS:
    -d, --debug             Explain how each segment was classified
    -t, --tracebacks        Full error details (implies --debug)
    --no-pty                Never allocate a pseudo-terminal for commands
    --no-init               Skip ~/.rillrc
    --shell <template>      Shell used for external commands (default: /bin/sh -c)
    --ps1 <prompt>          Primary prompt (default: ">>> ")
    --ps2 <prompt>          Continuation prompt (default: "... ")

STARTUP:
    ~/.rillrc               Executed on startup (if exists)
    ~/.rill_history         Command history
    RILL_SHELL              Same as --shell
    RILL_NO_PTY=1           Same as --no-pty
    RILL_DEBUG=1            Same as --debug
    RILL_TRACEBACKS=1       Same as --tracebacks
    RILL_BANNER=1           Show startup banner (quiet by default)

CORE CONCEPT:
    Segments separated by | form a pipeline. Each segment is tried as an
    expression, then a statement, then an external command. The current
    value is named _ and threads through every segment.

PIPELINE:
    echo a b c              External command; output becomes _ as lines
    _ * 6                   Expression over the current value
    x = _                   Statement; binds but leaves _ untouched
    # note                  Comment segment (skipped)
    echo hi |               Trailing | continues on the next line

LANGUAGE:
    numbers, 'strings', true/false, [lists]
    + - * / %  == != < > <= >=  and or not
    _[0]                    Index into the current value
    fn name(a, b) {{ ... }} Define a function (multi-line or inline)
    abs len num text sum min max head join split trim sh(...)

SESSION:
    cd('dir')  undo()  debug()  tracebacks()  shell('/bin/bash -c')

DIRECTIVES:
    %cd [dir]               Change directory
    %d                      Toggle debug mode
    %t                      Toggle tracebacks
    %u                      Swap in the previous pipeline value
    %r                      Reload ~/.rillrc

EXAMPLES:
    echo a b c | wc -w                # 3
    -6 | abs(_) | _ * 6               # 36
    echo a b | len(_[0])              # 3
    fn triple(n) {{ return n * 3 }}
    seq 3 | wc -l | triple(num(_[0])) # 9
    'hello world' | cat               # value fed to stdin
"#,
        VERSION
    );
}

pub(crate) fn print_version() {
    println!("rill {}", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        let mut v = vec!["rill".to_string()];
        v.extend(parts.iter().map(|s| s.to_string()));
        v
    }

    #[test]
    fn dash_c_joins_the_rest() {
        let cli = parse_args(&argv(&["-c", "echo", "a", "b"]));
        assert_eq!(cli.command.as_deref(), Some("echo a b"));
    }

    #[test]
    fn flags_before_dash_c_still_apply() {
        let cli = parse_args(&argv(&["--debug", "--no-pty", "-c", "5"]));
        assert!(cli.debug);
        assert!(cli.no_pty);
        assert_eq!(cli.command.as_deref(), Some("5"));
    }

    #[test]
    fn bare_path_is_a_script() {
        let cli = parse_args(&argv(&["setup.rill"]));
        assert_eq!(cli.script.as_deref(), Some("setup.rill"));
    }

    #[test]
    fn unknown_flag_is_reported_not_swallowed() {
        let cli = parse_args(&argv(&["--bogus"]));
        assert_eq!(cli.unknown.as_deref(), Some("--bogus"));
        assert!(cli.script.is_none());
    }

    #[test]
    fn shell_takes_a_value() {
        let cli = parse_args(&argv(&["--shell", "/bin/bash -c"]));
        assert_eq!(cli.shell.as_deref(), Some("/bin/bash -c"));
    }
}
