//! The iteration coordinator.
//!
//! One iteration, as seen from the coordinator:
//!
//! 1. idle, so every worker parks on the start barrier;
//! 2. sample the reference instant;
//! 3. cross the start barrier, releasing all workers at once;
//! 4. idle again while the workers spin;
//! 5. cross the end barrier, after which the whole row is visible;
//! 6. optionally verify the row, stopping on the first failure;
//! 7. honor a pending stop request or an expired wall-clock cap.
//!
//! Shutdown is one extra release: the coordinator publishes the shutdown
//! round, crosses the start barrier, sets `done`, and crosses the end
//! barrier. Workers skip the busy loop in that round and see `done` at the
//! top of their loop, so none of them is left parked on a barrier.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::MigrateConfig;
use crate::error::{Error, Result};
use crate::sched;
use crate::signal::{StopCause, StopController};
use crate::trace_mark;
use crate::trace_marker::TraceMarker;

use super::context::RunContext;
use super::results::{ResultStore, RunResults};
use super::task::WorkerTask;
use super::verify::{PriorityOrderVerifier, RowVerifier, Verdict, Violation};

/// Receives progress from the coordinator thread.
pub trait ProgressSink {
    /// Called once before the first iteration.
    fn begin(&mut self, _total: usize) {}

    /// Called after each iteration's end barrier.
    fn iteration(&mut self, completed: usize, total: usize);

    /// Called once after the last iteration, before workers are joined.
    fn finish(&mut self) {}
}

/// A sink that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn iteration(&mut self, _completed: usize, _total: usize) {}
}

/// Why the iteration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All requested iterations ran.
    Completed,
    /// The ordering check failed.
    OrderingViolation,
    /// A stop was requested by a signal or the caller.
    Interrupted(StopCause),
    /// The wall-clock cap expired.
    DeadlineReached,
}

impl StopReason {
    /// Returns true if the run ended before its iteration count for a
    /// reason other than a verdict.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::DeadlineReached)
    }
}

/// What is known about one worker after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskInfo {
    /// Task id.
    pub id: usize,
    /// Requested SCHED_FIFO priority.
    pub priority: i32,
    /// Kernel thread id.
    pub tid: i64,
    /// Whether the requested priority was actually applied. When false the
    /// task ran under default scheduling and the run proves less.
    pub priority_applied: bool,
    /// Whether this task hopped between CPUs.
    pub migrates: bool,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The configuration the run used.
    pub config: MigrateConfig,
    /// Final verdict; [`Verdict::Undecided`] unless checking was enabled.
    pub verdict: Verdict,
    /// The violation that failed the run, if any.
    pub violation: Option<Violation>,
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Recorded rows, truncated to the iterations that ran.
    pub results: RunResults,
    /// Per-worker details.
    pub tasks: Vec<TaskInfo>,
    /// Process id of the harness.
    pub parent_pid: u32,
    /// Whether the coordinator itself got its real-time priority.
    pub coordinator_priority_applied: bool,
    /// Wall-clock duration of the iteration loop.
    pub elapsed: Duration,
}

impl RunOutcome {
    /// Number of iterations that ran and were recorded.
    #[must_use]
    pub fn iterations_completed(&self) -> usize {
        self.results.iterations()
    }

    /// Returns true if any worker or the coordinator ran without its
    /// requested real-time priority.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.coordinator_priority_applied || self.tasks.iter().any(|task| !task.priority_applied)
    }
}

/// Drives a run from worker spawn to join.
pub struct Coordinator {
    config: MigrateConfig,
    stop: StopController,
    verifier: Box<dyn RowVerifier>,
    progress: Box<dyn ProgressSink>,
    marker: TraceMarker,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("stop", &self.stop)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator with the default verifier, no progress output
    /// and no trace marker.
    #[must_use]
    pub fn new(config: MigrateConfig, stop: StopController) -> Self {
        let verifier = PriorityOrderVerifier::new(config.max_error);
        Self {
            config,
            stop,
            verifier: Box::new(verifier),
            progress: Box::new(NoProgress),
            marker: TraceMarker::disabled(),
        }
    }

    /// Replaces the row verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl RowVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Sets the trace marker.
    #[must_use]
    pub fn with_trace_marker(mut self, marker: TraceMarker) -> Self {
        self.marker = marker;
        self
    }

    /// Runs the harness to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the result
    /// matrices cannot be allocated, or a worker cannot be spawned or
    /// joined. An ordering violation is not an error; see
    /// [`RunOutcome::verdict`].
    ///
    /// If spawning worker `k` fails, workers `0..k` are already parked on
    /// the start barrier, which needs every worker to trip. They stay parked
    /// and their threads are never joined. The binary exits right after
    /// such an error; long-lived callers should treat [`Error::Spawn`] as
    /// fatal for the process.
    pub fn run(self) -> Result<RunOutcome> {
        let Self {
            config,
            stop,
            verifier,
            mut progress,
            marker,
        } = self;

        config.validate()?;
        if config.equal_priority_is_noop() {
            tracing::warn!(
                tasks = config.task_count,
                "equal priority mode needs more than two tasks, ignoring"
            );
        }

        let results = ResultStore::try_new(config.iterations, config.task_count)?;
        let ctx = Arc::new(RunContext::new(config.clone(), results, marker));

        // A spawn failure leaves earlier workers parked on the start barrier.
        let workers = (0..config.task_count)
            .map(|id| WorkerTask::spawn(&ctx, id))
            .collect::<Result<Vec<_>>>()?;

        let coordinator_priority_applied =
            match sched::set_fifo_priority(config.coordinator_priority()) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        priority = config.coordinator_priority(),
                        error = %err,
                        "cannot set real-time priority of the coordinator"
                    );
                    false
                }
            };

        tracing::info!(
            tasks = config.task_count,
            iterations = config.iterations,
            run_ms = config.run_duration.as_millis(),
            idle_ms = config.idle_duration.as_millis(),
            max_error_us = config.max_error.as_micros(),
            check = config.check,
            "starting migration run"
        );

        let started = Instant::now();
        let deadline = config.wall_clock_limit.map(|limit| started + limit);
        let mut verdict = Verdict::Undecided;
        let mut violation = None;
        let mut stop_reason = StopReason::Completed;
        let mut completed = 0;

        progress.begin(config.iterations);
        for iteration in 0..config.iterations {
            thread::sleep(config.idle_duration);

            let now = ctx.open_iteration(iteration);
            trace_mark!(ctx.marker, "Loop {iteration} now={now}");

            ctx.start.wait();
            trace_mark!(ctx.marker, "All running!!!");

            thread::sleep(config.idle_duration);

            let end = ctx.now_ns();
            trace_mark!(
                ctx.marker,
                "Loop {iteration} end now={end} diff={}",
                end.saturating_sub(now)
            );

            ctx.end.wait();
            completed = iteration + 1;
            progress.iteration(completed, config.iterations);

            if config.check {
                let row = ctx.results.row(iteration);
                match verifier.verify(iteration, &row) {
                    Ok(()) => verdict.absorb(true),
                    Err(found) => {
                        verdict.absorb(false);
                        let tid = ctx.tasks.get(found.task).map_or(0, |slot| slot.tid());
                        trace_mark!(ctx.marker, "Task {tid} FAILED");
                        tracing::warn!(
                            iteration,
                            task = found.task,
                            delay_us = found.delay.as_micros(),
                            evidence = %found.evidence,
                            "priority ordering violated"
                        );
                        violation = Some(found);
                        stop_reason = StopReason::OrderingViolation;
                        break;
                    }
                }
            }

            if let Some(cause) = stop.stop_cause() {
                tracing::info!(iteration, ?cause, "stop requested, shutting down");
                stop_reason = StopReason::Interrupted(cause);
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::info!(iteration, "duration limit reached, shutting down");
                stop_reason = StopReason::DeadlineReached;
                break;
            }
        }
        progress.finish();
        let elapsed = started.elapsed();

        shutdown(&ctx, workers)?;

        let tasks = ctx
            .tasks
            .iter()
            .enumerate()
            .map(|(id, slot)| TaskInfo {
                id,
                priority: config.priority(id),
                tid: slot.tid(),
                priority_applied: slot.priority_applied(),
                migrates: id == config.highest_task(),
            })
            .collect();

        tracing::info!(
            iterations = completed,
            verdict = %verdict,
            ?stop_reason,
            elapsed_ms = elapsed.as_millis(),
            "migration run finished"
        );

        Ok(RunOutcome {
            results: ctx.results.snapshot(completed),
            config,
            verdict,
            violation,
            stop_reason,
            tasks,
            parent_pid: std::process::id(),
            coordinator_priority_applied,
            elapsed,
        })
    }
}

/// Releases every parked worker one last time and joins them.
fn shutdown(ctx: &RunContext, workers: Vec<JoinHandle<()>>) -> Result<()> {
    ctx.open_shutdown_round();
    ctx.start.wait();
    ctx.set_done();
    ctx.end.wait();

    for (task, worker) in workers.into_iter().enumerate() {
        worker
            .join()
            .map_err(|_| Error::WorkerPanicked { task })?;
    }
    tracing::debug!("all workers joined");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::results::Sample;
    use crate::harness::verify::Evidence;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    fn quick_config(tasks: usize, iterations: usize) -> MigrateConfig {
        MigrateConfig::new(tasks)
            .with_iterations(iterations)
            .with_run_duration(Duration::from_millis(1))
            .with_idle_duration(Duration::from_millis(3))
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Rc<RefCell<Vec<(usize, usize)>>>,
        finished: Rc<RefCell<bool>>,
    }

    impl ProgressSink for Recorder {
        fn iteration(&mut self, completed: usize, total: usize) {
            self.seen.borrow_mut().push((completed, total));
        }

        fn finish(&mut self) {
            *self.finished.borrow_mut() = true;
        }
    }

    struct FailAt {
        row: usize,
        calls: Arc<AtomicUsize>,
    }

    impl RowVerifier for FailAt {
        fn verify(&self, iteration: usize, _row: &[Sample]) -> std::result::Result<(), Violation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if iteration == self.row {
                return Err(Violation {
                    iteration,
                    task: 1,
                    delay: Duration::from_millis(5),
                    evidence: Evidence::ReducedWork {
                        loops: 1,
                        lower_loops: 2,
                    },
                });
            }
            Ok(())
        }
    }

    #[test]
    fn completes_all_iterations_and_records_every_cell() {
        init_test("completes_all_iterations_and_records_every_cell");
        let recorder = Recorder::default();
        let outcome = Coordinator::new(quick_config(3, 4), StopController::new())
            .with_progress(recorder.clone())
            .run()
            .expect("run failed");

        assert_eq!(outcome.stop_reason, StopReason::Completed);
        assert_eq!(outcome.iterations_completed(), 4);
        assert_eq!(outcome.verdict, Verdict::Undecided);
        for row in outcome.results.rows() {
            for sample in row {
                assert!(sample.loops >= 1, "{sample:?}");
                assert!(sample.start <= sample.finish, "{sample:?}");
                assert!(sample.run_time() >= Duration::from_millis(1), "{sample:?}");
            }
        }
        assert_eq!(*recorder.seen.borrow(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        assert!(*recorder.finished.borrow());
        assert_eq!(outcome.tasks.len(), 3);
        assert!(outcome.tasks.iter().all(|task| task.tid > 0));
        assert!(outcome.tasks[2].migrates);
        crate::test_complete!("completes_all_iterations_and_records_every_cell");
    }

    #[test]
    fn failure_truncates_run_and_stops_checking() {
        init_test("failure_truncates_run_and_stops_checking");
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = FailAt {
            row: 2,
            calls: Arc::clone(&calls),
        };
        let outcome = Coordinator::new(quick_config(2, 10).with_check(true), StopController::new())
            .with_verifier(verifier)
            .run()
            .expect("run failed");

        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(outcome.stop_reason, StopReason::OrderingViolation);
        assert_eq!(outcome.iterations_completed(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.violation.map(|v| v.iteration), Some(2));
        crate::test_complete!("failure_truncates_run_and_stops_checking");
    }

    #[test]
    fn verifier_not_consulted_without_check() {
        init_test("verifier_not_consulted_without_check");
        let calls = Arc::new(AtomicUsize::new(0));
        let verifier = FailAt {
            row: 0,
            calls: Arc::clone(&calls),
        };
        let outcome = Coordinator::new(quick_config(2, 2), StopController::new())
            .with_verifier(verifier)
            .run()
            .expect("run failed");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.verdict, Verdict::Undecided);
        assert_eq!(outcome.iterations_completed(), 2);
        crate::test_complete!("verifier_not_consulted_without_check");
    }

    #[test]
    fn pending_stop_ends_after_first_iteration() {
        init_test("pending_stop_ends_after_first_iteration");
        let stop = StopController::new();
        stop.stop();
        let outcome = Coordinator::new(quick_config(2, 50), stop)
            .run()
            .expect("run failed");
        assert_eq!(outcome.iterations_completed(), 1);
        assert_eq!(
            outcome.stop_reason,
            StopReason::Interrupted(StopCause::Requested)
        );
        assert!(outcome.stop_reason.is_external());
        crate::test_complete!("pending_stop_ends_after_first_iteration");
    }

    #[test]
    fn wall_clock_limit_ends_run() {
        init_test("wall_clock_limit_ends_run");
        let config = quick_config(1, 10_000).with_wall_clock_limit(Some(Duration::from_millis(30)));
        let outcome = Coordinator::new(config, StopController::new())
            .run()
            .expect("run failed");
        assert_eq!(outcome.stop_reason, StopReason::DeadlineReached);
        assert!(outcome.iterations_completed() < 10_000);
        assert!(outcome.iterations_completed() >= 1);
        crate::test_complete!("wall_clock_limit_ends_run");
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        init_test("invalid_config_is_rejected_before_spawning");
        let err = Coordinator::new(MigrateConfig::new(0), StopController::new())
            .run()
            .expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        crate::test_complete!("invalid_config_is_rejected_before_spawning");
    }
}
