//! Worker tasks and the calibrated busy loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::sched::{self, CpuRotation, CpuSet};
use crate::trace_mark;

use super::context::RunContext;
use super::results::Sample;

/// Spins until `run` has elapsed since `started` and returns the number of
/// loop iterations completed.
///
/// The loop body only increments a counter and reads the monotonic clock:
/// no allocation, no syscall that can block, no yield. A task that is
/// preempted therefore completes fewer loops in the same wall-clock window,
/// which is what makes the count a proxy for CPU time received. The body
/// runs at least once.
#[inline(never)]
pub fn busy_loop(started: Instant, run: Duration) -> u64 {
    let mut loops: u64 = 0;
    loop {
        loops = loops.wrapping_add(1);
        if started.elapsed() >= run {
            return loops;
        }
    }
}

/// One SCHED_FIFO worker thread.
pub(crate) struct WorkerTask {
    id: usize,
    priority: i32,
    ctx: Arc<RunContext>,
}

impl WorkerTask {
    /// Spawns worker `id` on a named OS thread.
    pub(crate) fn spawn(ctx: &Arc<RunContext>, id: usize) -> Result<JoinHandle<()>> {
        let task = Self {
            id,
            priority: ctx.config.priority(id),
            ctx: Arc::clone(ctx),
        };
        thread::Builder::new()
            .name(format!("rt-migrate-{id}"))
            .spawn(move || task.run())
            .map_err(|source| Error::Spawn { task: id, source })
    }

    /// The highest-priority task rotates over the CPUs it was allowed on
    /// at startup; everyone else keeps the inherited mask.
    fn rotation(&self) -> Option<CpuRotation> {
        if self.id != self.ctx.config.highest_task() {
            return None;
        }
        match CpuSet::current() {
            Ok(set) => Some(CpuRotation::new(set)),
            Err(err) => {
                tracing::debug!(task = self.id, error = %err, "cannot read affinity, not migrating");
                None
            }
        }
    }

    fn run(self) {
        let ctx = &*self.ctx;
        let slot = &ctx.tasks[self.id];
        let tid = sched::current_thread_id();
        slot.set_tid(tid);

        let mut rotation = self.rotation();

        match sched::set_fifo_priority(self.priority) {
            Ok(()) => slot.set_priority_applied(true),
            Err(err) => {
                slot.set_priority_applied(false);
                tracing::warn!(
                    task = self.id,
                    priority = self.priority,
                    error = %err,
                    "cannot set real-time priority, running with default scheduling"
                );
            }
        }
        tracing::debug!(task = self.id, tid, priority = self.priority, "worker ready");

        while !ctx.is_done() {
            if let Some(rotation) = rotation.as_mut() {
                rotation.rotate();
            }

            ctx.start.wait();

            if let Some(iteration) = ctx.current_iteration() {
                let started = Instant::now();
                let start = ctx.since_reference(started);
                trace_mark!(
                    ctx.marker,
                    "Thread {tid}: started {} diff {}",
                    ctx.nanos_at(started),
                    start.as_nanos()
                );
                let loops = busy_loop(started, ctx.config.run_duration);
                let finish = ctx.since_reference(Instant::now());
                ctx.results.record(
                    iteration,
                    self.id,
                    Sample {
                        start,
                        finish,
                        loops,
                    },
                );
            }

            ctx.end.wait();
        }
        tracing::debug!(task = self.id, "worker exiting");
    }
}
