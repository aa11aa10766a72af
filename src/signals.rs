//! SIGINT plumbing for the pty relay.
//!
//! The read loop itself handles Ctrl-C through the line editor; this flag
//! exists so a relay loop babysitting a pty child can notice an interrupt
//! and pass it along instead of dying with the session.

use std::sync::atomic::{AtomicBool, Ordering};

/// Flag set by the signal handler, drained by `take_interrupt`.
pub static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler. Safe to call more than once.
#[cfg(unix)]
pub fn setup_signal_handlers() {
    use signal_hook::low_level;

    unsafe {
        let _ = low_level::register(signal_hook::consts::SIGINT, || {
            SIGINT_RECEIVED.store(true, Ordering::SeqCst);
        });
    }
}

/// No-op on non-Unix.
#[cfg(not(unix))]
pub fn setup_signal_handlers() {}

/// Check whether SIGINT arrived since the last check, clearing the flag.
pub fn take_interrupt() -> bool {
    SIGINT_RECEIVED.swap(false, Ordering::SeqCst)
}
