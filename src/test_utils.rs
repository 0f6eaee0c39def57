//! Shared helpers for unit tests.
//!
//! Every test calls [`init_test_logging`] first so `RUST_LOG` works under
//! `cargo test`, then brackets its body with [`test_phase!`] and
//! [`test_complete!`] so interleaved output from parallel tests stays
//! readable.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber exactly once per process.
pub(crate) fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,rt_migrate=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Marks the start of a test phase.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "test phase started");
    };
}

/// Marks the successful end of a test.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test complete");
    };
}

/// Asserts a condition and logs the expected and actual values on failure.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $what:expr, $expected:expr, $actual:expr) => {
        if !$cond {
            tracing::error!(
                what = %$what,
                expected = ?$expected,
                actual = ?$actual,
                "assertion failed"
            );
        }
        assert!(
            $cond,
            "{}: expected {:?}, got {:?}",
            $what,
            $expected,
            $actual
        );
    };
}
