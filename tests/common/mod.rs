//! Helpers shared by the integration tests.
#![allow(dead_code, unused_macros)]

use std::sync::Once;
use std::time::Duration;

use rt_migrate::config::MigrateConfig;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber that writes through the test harness.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,rt_migrate=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A configuration that finishes quickly on any machine.
pub fn fast_config(tasks: usize, iterations: usize) -> MigrateConfig {
    MigrateConfig::new(tasks)
        .with_iterations(iterations)
        .with_run_duration(Duration::from_millis(2))
        .with_idle_duration(Duration::from_millis(5))
}

#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========== {} ==========", $name);
    };
}

#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::info!(section = %$name, "---------- {} ----------", $name);
    };
}

#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test complete");
    };
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(test = %$name, $($key = ?$value),+, "test complete");
    };
}
