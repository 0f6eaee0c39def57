//! Empirical verification of fixed-priority real-time scheduling under CPU
//! migration.
//!
//! `rt-migrate` releases `N` SCHED_FIFO worker threads of strictly increasing
//! priority in lock-step, lets each spin for a calibrated amount of wall-clock
//! time, and records when every worker actually started, when it finished and
//! how much work it managed to do. The highest-priority worker hops to a new
//! CPU every iteration so the scheduler has to migrate tasks to keep the
//! priority order intact.
//!
//! After every iteration an ordering check decides whether the observed
//! timings are consistent with correct priority scheduling. A bare start-time
//! gap is treated as wake-up noise; it only counts as a violation when the
//! higher-priority task also did less work, was fully serialized behind the
//! lower-priority one, or was still lagging at completion.
//!
//! # Modules
//!
//! - [`config`]: run parameters and priority derivation
//! - [`harness`]: worker tasks, the iteration coordinator, result storage and
//!   the ordering verifier
//! - [`sync`]: the reusable rendezvous barrier
//! - [`signal`]: stop requests from signals, deadlines or callers
//! - [`sched`]: SCHED_FIFO and CPU affinity primitives
//! - [`report`]: console and JSON summaries
//! - [`trace_marker`]: best-effort ftrace progress markers
//! - [`cli`]: exit codes, structured CLI errors and the progress bar
//!
//! # Example
//!
//! ```no_run
//! use rt_migrate::config::MigrateConfig;
//! use rt_migrate::harness::Coordinator;
//! use rt_migrate::signal::StopController;
//! use std::time::Duration;
//!
//! let config = MigrateConfig::new(4)
//!     .with_iterations(10)
//!     .with_run_duration(Duration::from_millis(5))
//!     .with_check(true);
//!
//! let outcome = Coordinator::new(config, StopController::new())
//!     .run()
//!     .expect("harness failed to start");
//! println!("verdict: {}", outcome.verdict);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod harness;
pub mod report;
pub mod sched;
pub mod signal;
pub mod sync;
pub mod trace_marker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::MigrateConfig;
pub use error::{Error, Result};
pub use harness::{Coordinator, RunOutcome, StopReason, Verdict};
