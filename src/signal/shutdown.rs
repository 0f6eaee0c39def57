//! Stop controller shared between the caller and the coordinator.
//!
//! The coordinator polls [`StopController::stop_cause`] once per iteration,
//! after the end barrier. A stop never interrupts an iteration in flight; it
//! turns into the same clean shutdown as reaching the iteration count.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{SignalKind, handler};

/// Why a stop was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// [`StopController::stop`] was called.
    Requested,
    /// A stop signal was delivered to the process.
    Signal(SignalKind),
}

/// Internal state shared between clones of a controller.
#[derive(Debug)]
struct StopState {
    /// Tracks whether a programmatic stop has been requested.
    requested: AtomicBool,
    /// Whether process signals count as stop requests.
    listening: AtomicBool,
    /// Signal deliveries that happened before listening started.
    baseline: AtomicU64,
}

/// Controller for requesting a clean stop of a run.
///
/// Clones share state, so a caller can keep one handle and pass another to
/// the [`Coordinator`](crate::harness::Coordinator).
///
/// # Example
///
/// ```
/// use rt_migrate::signal::{StopCause, StopController};
///
/// let controller = StopController::new();
/// let handle = controller.clone();
/// assert!(!handle.is_stop_requested());
///
/// controller.stop();
/// assert_eq!(handle.stop_cause(), Some(StopCause::Requested));
/// ```
#[derive(Debug, Clone)]
pub struct StopController {
    state: Arc<StopState>,
}

impl StopController {
    /// Creates a new controller with no stop pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState {
                requested: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                baseline: AtomicU64::new(0),
            }),
        }
    }

    /// Requests a stop. Idempotent; once requested it cannot be reset.
    pub fn stop(&self) {
        if self
            .state
            .requested
            .compare_exchange(false, true, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            tracing::debug!("stop requested");
        }
    }

    /// Installs process signal handlers for `kinds` and treats their
    /// delivery as a stop request from now on. Signals delivered before this
    /// call are ignored.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a handler cannot be installed.
    pub fn listen_for_signals(&self, kinds: &[SignalKind]) -> std::io::Result<()> {
        handler::install(kinds)?;
        if !self.state.listening.load(Ordering::Acquire) {
            self.state
                .baseline
                .store(handler::delivered(), Ordering::Release);
            self.state.listening.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Returns the pending stop cause, if any.
    #[must_use]
    pub fn stop_cause(&self) -> Option<StopCause> {
        if self.state.requested.load(Ordering::Acquire) {
            return Some(StopCause::Requested);
        }
        if self.state.listening.load(Ordering::Acquire) {
            let baseline = self.state.baseline.load(Ordering::Acquire);
            return handler::pending_since(baseline).map(StopCause::Signal);
        }
        None
    }

    /// Checks if a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_cause().is_some()
    }
}

impl Default for StopController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn stop_is_visible_through_clones() {
        init_test("stop_is_visible_through_clones");
        let controller = StopController::new();
        let handle = controller.clone();
        assert!(!handle.is_stop_requested());
        assert_eq!(handle.stop_cause(), None);

        controller.stop();
        let cause = handle.stop_cause();
        crate::assert_with_log!(
            cause == Some(StopCause::Requested),
            "cause",
            Some(StopCause::Requested),
            cause
        );
        crate::test_complete!("stop_is_visible_through_clones");
    }

    #[test]
    fn double_stop_is_idempotent() {
        init_test("double_stop_is_idempotent");
        let controller = StopController::new();
        controller.stop();
        controller.stop();
        assert!(controller.is_stop_requested());
        crate::test_complete!("double_stop_is_idempotent");
    }

    #[test]
    fn stop_from_another_thread() {
        init_test("stop_from_another_thread");
        let controller = StopController::new();
        let remote = controller.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            remote.stop();
        });
        handle.join().expect("thread failed");
        assert!(controller.is_stop_requested());
        crate::test_complete!("stop_from_another_thread");
    }

    // The only test in the crate that raises a signal, so deliveries from
    // parallel tests cannot leak into it.
    #[cfg(unix)]
    #[test]
    fn signal_before_listening_is_ignored() {
        init_test("signal_before_listening_is_ignored");
        let first = StopController::new();
        first
            .listen_for_signals(&[SignalKind::User1])
            .expect("install failed");
        // SAFETY: raising a signal we just installed a handler for.
        let ret = unsafe { libc::raise(libc::SIGUSR1) };
        assert_eq!(ret, 0);
        let cause = first.stop_cause();
        crate::assert_with_log!(
            cause == Some(StopCause::Signal(SignalKind::User1)),
            "listening controller sees signal",
            Some(StopCause::Signal(SignalKind::User1)),
            cause
        );

        let second = StopController::new();
        second
            .listen_for_signals(&[SignalKind::User1])
            .expect("install failed");
        let cause = second.stop_cause();
        crate::assert_with_log!(
            cause.is_none(),
            "earlier signal is not replayed",
            None::<StopCause>,
            cause
        );
        assert!(first.is_stop_requested());
        crate::test_complete!("signal_before_listening_is_ignored");
    }
}
