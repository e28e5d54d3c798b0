//! `SIGBUS`/`SIGINT` handling (§5, §7, §9 design note).
//!
//! The spec's source material longjmps out of a `SIGBUS` handler straight
//! back to the top of the mainloop; §9 explicitly redirects that to "a
//! checked mainloop that polls a `sigbus` flag after each `select`" instead,
//! which is what this module backs. Handlers only ever touch `AtomicBool`s
//! (the one async-signal-safe thing to do in a signal handler), matching the
//! raw-`libc`-handler idiom the pack repos use rather than hand-rolling a
//! `longjmp` in Rust.

use std::sync::atomic::{AtomicBool, Ordering};

static SIGBUS_FLAG: AtomicBool = AtomicBool::new(false);
static SIGINT_FLAG: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigbus(_signum: libc::c_int) {
    SIGBUS_FLAG.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigint(_signum: libc::c_int) {
    SIGINT_FLAG.store(true, Ordering::SeqCst);
}

/// Installs both handlers. Safe to call more than once; later calls just
/// reinstall the same handler.
///
/// # Safety
/// Registers a C signal handler via `libc::signal`; the handler itself only
/// performs an atomic store, which is async-signal-safe.
pub unsafe fn install() {
    unsafe {
        libc::signal(libc::SIGBUS, on_sigbus as libc::sighandler_t);
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
}

/// Polled once per mainloop iteration, after `select`/`poll` returns (§5,
/// §9). Clears the flag so the caller observes each fault exactly once.
pub fn take_sigbus() -> bool {
    SIGBUS_FLAG.swap(false, Ordering::SeqCst)
}

/// `SIGINT` sets `cancel_filter` (§5), consulted by long-running
/// collaborator operations; the editor itself never unwinds on it.
pub fn cancel_requested() -> bool {
    SIGINT_FLAG.swap(false, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_sigbus_clears_after_reading() {
        SIGBUS_FLAG.store(true, Ordering::SeqCst);
        assert!(take_sigbus());
        assert!(!take_sigbus());
    }

    #[test]
    fn cancel_requested_clears_after_reading() {
        SIGINT_FLAG.store(true, Ordering::SeqCst);
        assert!(cancel_requested());
        assert!(!cancel_requested());
    }
}
