//! State shared by the coordinator and every worker of one run.
//!
//! Single-writer discipline per field:
//!
//! | field            | writer            | readers                    |
//! |------------------|-------------------|----------------------------|
//! | `reference_ns`   | coordinator       | workers, after start wait  |
//! | `iteration`      | coordinator       | workers, after start wait  |
//! | `done`           | coordinator       | workers, after end wait    |
//! | result column `i`| worker `i`        | coordinator, after end wait|
//! | `tasks[i]`       | worker `i`        | coordinator, after join    |
//!
//! Every write is published by the next barrier crossing, so relaxed atomics
//! suffice everywhere.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::MigrateConfig;
use crate::sync::Barrier;
use crate::trace_marker::TraceMarker;

use super::results::ResultStore;

/// Iteration index published for the final wake-up round.
const SHUTDOWN_ROUND: usize = usize::MAX;

/// What each worker reports about itself.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    tid: AtomicI64,
    priority_applied: AtomicBool,
}

impl TaskSlot {
    pub(crate) fn set_tid(&self, tid: i64) {
        self.tid.store(tid, Ordering::Relaxed);
    }

    pub(crate) fn tid(&self) -> i64 {
        self.tid.load(Ordering::Relaxed)
    }

    pub(crate) fn set_priority_applied(&self, applied: bool) {
        self.priority_applied.store(applied, Ordering::Relaxed);
    }

    pub(crate) fn priority_applied(&self) -> bool {
        self.priority_applied.load(Ordering::Relaxed)
    }
}

/// Run context handed to every thread of a run.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) config: MigrateConfig,
    pub(crate) start: Barrier,
    pub(crate) end: Barrier,
    pub(crate) results: ResultStore,
    pub(crate) marker: TraceMarker,
    pub(crate) tasks: Vec<TaskSlot>,
    epoch: Instant,
    reference_ns: AtomicU64,
    iteration: AtomicUsize,
    done: AtomicBool,
}

impl RunContext {
    pub(crate) fn new(config: MigrateConfig, results: ResultStore, marker: TraceMarker) -> Self {
        let parties = config.task_count + 1;
        let tasks = (0..config.task_count).map(|_| TaskSlot::default()).collect();
        Self {
            config,
            start: Barrier::new(parties),
            end: Barrier::new(parties),
            results,
            marker,
            tasks,
            epoch: Instant::now(),
            reference_ns: AtomicU64::new(0),
            iteration: AtomicUsize::new(SHUTDOWN_ROUND),
            done: AtomicBool::new(false),
        }
    }

    /// Nanoseconds from the run epoch to `instant`.
    pub(crate) fn nanos_at(&self, instant: Instant) -> u64 {
        u64::try_from(instant.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    /// Nanoseconds since the run epoch.
    pub(crate) fn now_ns(&self) -> u64 {
        self.nanos_at(Instant::now())
    }

    /// Time from the current iteration's reference instant to `instant`.
    pub(crate) fn since_reference(&self, instant: Instant) -> Duration {
        let reference = self.reference_ns.load(Ordering::Relaxed);
        Duration::from_nanos(self.nanos_at(instant).saturating_sub(reference))
    }

    /// Opens iteration `iteration`, sampling and publishing its reference
    /// instant. Coordinator only, before the start barrier.
    pub(crate) fn open_iteration(&self, iteration: usize) -> u64 {
        let reference = self.now_ns();
        self.reference_ns.store(reference, Ordering::Relaxed);
        self.iteration.store(iteration, Ordering::Relaxed);
        reference
    }

    /// Marks the next release as the shutdown round. Coordinator only.
    pub(crate) fn open_shutdown_round(&self) {
        self.iteration.store(SHUTDOWN_ROUND, Ordering::Relaxed);
    }

    /// Iteration the workers were just released into, `None` during the
    /// shutdown round.
    pub(crate) fn current_iteration(&self) -> Option<usize> {
        let iteration = self.iteration.load(Ordering::Relaxed);
        (iteration != SHUTDOWN_ROUND).then_some(iteration)
    }

    pub(crate) fn set_done(&self) {
        self.done.store(true, Ordering::Relaxed);
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }
}
