//! Process-wide signal handler that records a pending stop request.
//!
//! The handler does nothing but store the signal number and bump a delivery
//! counter; the coordinator polls them once per iteration through
//! [`StopController`](super::StopController). No other work happens in
//! signal context.
//!
//! The statics are process-wide and never reset. A controller remembers the
//! counter value from when it started listening and only reacts to
//! deliveries after that point.

use std::io;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use super::SignalKind;

/// Last stop signal delivered to the process, 0 if none.
static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Number of stop signals delivered so far.
static DELIVERED: AtomicU64 = AtomicU64::new(0);

#[cfg(unix)]
extern "C" fn record_signal(signum: libc::c_int) {
    LAST_SIGNAL.store(signum, Ordering::Relaxed);
    DELIVERED.fetch_add(1, Ordering::Release);
}

/// Installs the recording handler for every kind in `kinds`.
///
/// `SA_RESTART` is set so that sleeps and barrier waits in flight are not
/// cut short; the stop is observed at the next poll point instead.
///
/// # Errors
///
/// Returns the OS error if `sigaction(2)` rejects a signal.
#[cfg(unix)]
pub fn install(kinds: &[SignalKind]) -> io::Result<()> {
    let handler: extern "C" fn(libc::c_int) = record_signal;
    for kind in kinds {
        // SAFETY: an all-zero sigaction is a valid starting point.
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        // SAFETY: `action.sa_mask` is a valid, exclusively borrowed sigset.
        unsafe { libc::sigemptyset(&raw mut action.sa_mask) };
        // SAFETY: `action` is fully initialised and the handler only touches
        // an atomic, which is async-signal-safe.
        let ret = unsafe { libc::sigaction(kind.as_raw_value(), &raw const action, std::ptr::null_mut()) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::debug!(signal = %kind, "stop handler installed");
    }
    Ok(())
}

/// Installs the recording handler for every kind in `kinds`.
///
/// # Errors
///
/// Always fails on this platform.
#[cfg(not(unix))]
pub fn install(_kinds: &[SignalKind]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "signal handling requires Unix",
    ))
}

/// Returns the number of stop signals delivered so far.
#[must_use]
pub fn delivered() -> u64 {
    DELIVERED.load(Ordering::Acquire)
}

/// Returns the most recent stop signal if any arrived after `baseline`
/// deliveries.
#[must_use]
pub fn pending_since(baseline: u64) -> Option<SignalKind> {
    if delivered() <= baseline {
        return None;
    }
    let raw = LAST_SIGNAL.load(Ordering::Relaxed);
    #[cfg(unix)]
    {
        SignalKind::from_raw_value(raw)
    }
    #[cfg(not(unix))]
    {
        None
    }
}
