//! Pseudo-terminal adapter for terminal-facing external commands.
//!
//! Used for the final segment of a line when the session itself is on a
//! terminal, so children that check "am I interactive" (pagers, editors,
//! anything with a progress bar) behave as they would in a plain shell.
//! Output is relayed to the screen as it arrives and captured for the
//! pipeline at the same time. Any setup failure is reported to the caller,
//! which degrades to the plain runner.

use crate::runner::ProcessResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("pty is not supported on this platform")]
    Unsupported,
    #[error("shell template is empty")]
    EmptyTemplate,
    #[error("argv contains an interior nul byte")]
    BadArgv,
    #[cfg(unix)]
    #[error("pty setup failed: {0}")]
    Nix(#[from] nix::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(unix)]
pub use imp::{run, stdout_is_tty};

#[cfg(not(unix))]
pub fn run(
    _shell_argv: &[String],
    _command_text: &str,
    _input: Option<&str>,
) -> Result<ProcessResult, PtyError> {
    Err(PtyError::Unsupported)
}

#[cfg(not(unix))]
pub fn stdout_is_tty() -> bool {
    false
}

/// Strip ANSI escape sequences, tolerate stray control bytes, and unify
/// line endings before splitting into lines.
pub fn normalize_capture(bytes: &[u8]) -> Vec<String> {
    use regex::Regex;
    use std::sync::OnceLock;

    static ANSI: OnceLock<Regex> = OnceLock::new();
    let ansi = ANSI.get_or_init(|| {
        Regex::new("\x1B[@-_][0-?]*[ -/]*[@-~]").unwrap_or_else(|_| unreachable!())
    });

    let text = String::from_utf8_lossy(bytes);
    let stripped = ansi.replace_all(&text, "");
    let unified = stripped.replace("\r\n", "\n").replace('\r', "");
    unified.lines().map(String::from).collect()
}

#[cfg(unix)]
mod imp {
    use super::{normalize_capture, PtyError};
    use crate::runner::ProcessResult;
    use crate::signals;
    use log::debug;
    use nix::pty::{openpty, OpenptyResult, Winsize};
    use nix::sys::signal::{kill, Signal};
    use nix::sys::termios::{cfmakeraw, tcgetattr, tcsetattr, SetArg, Termios};
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    use nix::unistd::{execvp, fork, ForkResult, Pid};
    use std::ffi::CString;
    use std::io::{self, Write};
    use std::os::fd::{IntoRawFd, RawFd};

    pub fn stdout_is_tty() -> bool {
        unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 }
    }

    /// Put the real terminal in raw mode for the lifetime of the relay so
    /// keystrokes reach the child unmolested; restores the old settings on
    /// every exit path.
    struct RawGuard {
        original: Termios,
    }

    impl RawGuard {
        fn enable() -> Option<RawGuard> {
            let stdin = io::stdin();
            let original = tcgetattr(&stdin).ok()?;
            let mut raw = original.clone();
            cfmakeraw(&mut raw);
            tcsetattr(&stdin, SetArg::TCSANOW, &raw).ok()?;
            Some(RawGuard { original })
        }
    }

    impl Drop for RawGuard {
        fn drop(&mut self) {
            let _ = tcsetattr(&io::stdin(), SetArg::TCSANOW, &self.original);
        }
    }

    fn winsize() -> Option<Winsize> {
        terminal_size::terminal_size().map(|(w, h)| Winsize {
            ws_row: h.0,
            ws_col: w.0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        })
    }

    pub fn run(
        shell_argv: &[String],
        command_text: &str,
        input: Option<&str>,
    ) -> Result<ProcessResult, PtyError> {
        if shell_argv.is_empty() {
            return Err(PtyError::EmptyTemplate);
        }

        // Everything the child needs is prepared before fork; the child may
        // only dup/exec/_exit.
        let mut argv = Vec::with_capacity(shell_argv.len() + 1);
        for arg in shell_argv {
            argv.push(CString::new(arg.as_str()).map_err(|_| PtyError::BadArgv)?);
        }
        argv.push(CString::new(command_text).map_err(|_| PtyError::BadArgv)?);

        let ws = winsize();
        let OpenptyResult { master, slave } = openpty(ws.as_ref(), None)?;
        let master_raw = master.into_raw_fd();
        let slave_raw = slave.into_raw_fd();

        // The pipeline value, if line-like, goes in through a plain pipe so
        // it is not echoed back by the terminal layer.
        let (input_read, input_write) = match input {
            Some(_) => {
                let mut fds = [0i32; 2];
                if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
                    let err = io::Error::last_os_error();
                    unsafe {
                        libc::close(master_raw);
                        libc::close(slave_raw);
                    }
                    return Err(PtyError::Io(err));
                }
                (Some(fds[0]), Some(fds[1]))
            }
            None => (None, None),
        };

        let fork_result = match unsafe { fork() } {
            Ok(r) => r,
            Err(e) => {
                unsafe {
                    libc::close(master_raw);
                    libc::close(slave_raw);
                }
                if let (Some(r), Some(w)) = (input_read, input_write) {
                    unsafe {
                        libc::close(r);
                        libc::close(w);
                    }
                }
                return Err(PtyError::Nix(e));
            }
        };

        match fork_result {
            ForkResult::Child => {
                let _ = nix::unistd::setsid();
                unsafe {
                    libc::ioctl(slave_raw, libc::TIOCSCTTY, 0);
                    libc::close(master_raw);
                    match input_read {
                        Some(r) => {
                            libc::dup2(r, 0);
                            if r > 2 {
                                libc::close(r);
                            }
                            if let Some(w) = input_write {
                                libc::close(w);
                            }
                        }
                        None => {
                            libc::dup2(slave_raw, 0);
                        }
                    }
                    libc::dup2(slave_raw, 1);
                    libc::dup2(slave_raw, 2);
                    if slave_raw > 2 {
                        libc::close(slave_raw);
                    }
                }
                let argv_refs: Vec<&std::ffi::CStr> =
                    argv.iter().map(|a| a.as_c_str()).collect();
                let _ = execvp(argv_refs[0], &argv_refs);
                unsafe { libc::_exit(127) }
            }
            ForkResult::Parent { child } => {
                unsafe { libc::close(slave_raw) };
                if let Some(r) = input_read {
                    unsafe { libc::close(r) };
                }
                let result = relay(master_raw, child, input, input_write);
                unsafe { libc::close(master_raw) };
                result
            }
        }
    }

    /// Pump bytes between the real terminal and the pty master while the
    /// child runs, capturing everything the child writes.
    fn relay(
        master: RawFd,
        child: Pid,
        input: Option<&str>,
        input_write: Option<RawFd>,
    ) -> Result<ProcessResult, PtyError> {
        // The pipeline value is fed incrementally from inside the poll loop.
        // Pushing it all up front wedges against a child that starts writing
        // before it finishes reading, once both pipe buffers fill.
        let mut feed: Option<(RawFd, &[u8])> = match (input, input_write) {
            (Some(text), Some(w)) => {
                set_nonblocking(w);
                Some((w, text.as_bytes()))
            }
            (None, Some(w)) => {
                unsafe { libc::close(w) };
                None
            }
            _ => None,
        };

        let forward_keys = input.is_none() && unsafe { libc::isatty(0) == 1 };
        let _raw = if forward_keys { RawGuard::enable() } else { None };

        let mut capture: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4096];
        let mut status: Option<i32> = None;

        loop {
            if signals::take_interrupt() {
                debug!("interrupt: signalling pty child {}", child);
                let _ = kill(child, Signal::SIGINT);
            }

            // A negative fd is skipped by poll.
            let feed_fd = feed.map_or(-1, |(w, _)| w);
            let mut fds = [
                libc::pollfd {
                    fd: master,
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: libc::STDIN_FILENO,
                    events: if forward_keys { libc::POLLIN } else { 0 },
                    revents: 0,
                },
                libc::pollfd {
                    fd: feed_fd,
                    events: libc::POLLOUT,
                    revents: 0,
                },
            ];
            let n = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, 50) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                let _ = kill(child, Signal::SIGKILL);
                let _ = waitpid(child, None);
                return Err(PtyError::Io(err));
            }

            if fds[0].revents & (libc::POLLIN | libc::POLLHUP) != 0 {
                let r = unsafe {
                    libc::read(master, buf.as_mut_ptr() as *mut libc::c_void, buf.len())
                };
                if r > 0 {
                    let chunk = &buf[..r as usize];
                    capture.extend_from_slice(chunk);
                    let mut out = io::stdout().lock();
                    let _ = out.write_all(chunk);
                    let _ = out.flush();
                } else {
                    // EOF or EIO: the child closed its side.
                    break;
                }
            }

            if forward_keys && fds[1].revents & libc::POLLIN != 0 {
                let r = unsafe {
                    libc::read(
                        libc::STDIN_FILENO,
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                    )
                };
                if r > 0 {
                    write_all(master, &buf[..r as usize]);
                }
            }

            if let Some((w, bytes)) = feed {
                if fds[2].revents & (libc::POLLOUT | libc::POLLERR | libc::POLLHUP) != 0 {
                    let n = unsafe {
                        libc::write(w, bytes.as_ptr() as *const libc::c_void, bytes.len())
                    };
                    if n > 0 {
                        let rest = &bytes[n as usize..];
                        if rest.is_empty() {
                            unsafe { libc::close(w) };
                            feed = None;
                        } else {
                            feed = Some((w, rest));
                        }
                    } else if io::Error::last_os_error().kind() != io::ErrorKind::WouldBlock {
                        // The child stopped reading; nothing left to feed.
                        unsafe { libc::close(w) };
                        feed = None;
                    }
                }
            }

            if status.is_none() {
                match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
                    Ok(WaitStatus::Exited(_, code)) => status = Some(code),
                    Ok(WaitStatus::Signaled(_, sig, _)) => status = Some(128 + sig as i32),
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }

        if let Some((w, _)) = feed {
            unsafe { libc::close(w) };
        }

        let status = match status {
            Some(code) => code,
            // Child still running after master EOF; this wait is the one
            // that must happen on every path.
            None => match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => code,
                Ok(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
                _ => -1,
            },
        };

        Ok(ProcessResult {
            lines: normalize_capture(&capture),
            status,
            used_pty: true,
        })
    }

    fn set_nonblocking(fd: RawFd) {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags >= 0 {
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
            }
        }
    }

    fn write_all(fd: RawFd, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let n = unsafe {
                libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len())
            };
            if n <= 0 {
                break;
            }
            bytes = &bytes[n as usize..];
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_ansi_escapes() {
        let bytes = b"\x1b[1;32mgreen\x1b[0m text\r\n";
        assert_eq!(normalize_capture(bytes), vec!["green text"]);
    }

    #[test]
    fn normalization_tolerates_stray_control_bytes() {
        let bytes = b"ok\xff\xfe\r\ndone\r\n";
        let lines = normalize_capture(bytes);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ok"));
        assert_eq!(lines[1], "done");
    }

    #[test]
    fn normalization_drops_bare_carriage_returns() {
        assert_eq!(normalize_capture(b"50%\r100%\r\n"), vec!["50%100%"]);
    }

    // openpty needs no controlling terminal, so the relay runs under the
    // test harness too.
    #[cfg(unix)]
    #[test]
    fn large_input_is_fed_while_output_drains() {
        let sh = vec!["/bin/sh".to_string(), "-c".to_string()];
        let big = "y".repeat(256 * 1024);
        let result = run(&sh, "cat", Some(&big)).unwrap();
        assert_eq!(result.status, 0);
        assert_eq!(
            result.lines.iter().map(String::len).sum::<usize>(),
            big.len()
        );
    }
}
