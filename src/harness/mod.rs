//! The migration harness: workers, coordinator, result storage and the
//! ordering verdict.
//!
//! A run spawns `N` SCHED_FIFO workers with strictly increasing priorities
//! (or an equal-priority band in the middle). In each iteration the
//! coordinator releases them all at once through a shared barrier; every
//! worker spins for the configured run time and records when it woke up,
//! when it finished and how many loops it managed. The highest-priority
//! worker also hops to the next allowed CPU before every iteration, forcing
//! the scheduler to push or pull tasks around it.

mod context;
mod coordinator;
mod results;
mod task;
mod verify;

pub use coordinator::{Coordinator, NoProgress, ProgressSink, RunOutcome, StopReason, TaskInfo};
pub use results::{ResultStore, RunResults, Sample, TaskStats};
pub use task::busy_loop;
pub use verify::{Evidence, PriorityOrderVerifier, RowVerifier, Verdict, Violation, check_row};
