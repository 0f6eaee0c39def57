//! Priority-ordering verdict for one iteration.
//!
//! Tasks are compared pairwise in id order: task `i` has higher (or, inside
//! the equal-priority band, the same) priority as task `i - 1`, so it should
//! not wake up noticeably later. A start-time gap above the tolerance is only
//! a *candidate*; wake-up latency varies, and a late start that is made up
//! for is noise. The gap becomes a violation when at least one of these also
//! holds:
//!
//! - the higher-priority task completed fewer busy-loop iterations, i.e. it
//!   lost CPU time to the lower-priority one;
//! - it did not start until the lower-priority task had already finished;
//! - it also finished more than the tolerance after the lower-priority task.

use std::fmt;
use std::time::Duration;

use super::results::Sample;

/// Run-level verdict. Monotonic: once [`Verdict::Fail`], always `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// No row has been checked (or checking is disabled).
    #[default]
    Undecided,
    /// Every checked row passed.
    Pass,
    /// At least one row failed.
    Fail,
}

impl Verdict {
    /// Folds one row's outcome into the verdict.
    pub fn absorb(&mut self, row_passed: bool) {
        *self = match (*self, row_passed) {
            (Self::Fail, _) | (_, false) => Self::Fail,
            (_, true) => Self::Pass,
        };
    }

    /// Returns true for [`Verdict::Fail`].
    #[must_use]
    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Returns a lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undecided => "undecided",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence that turned a start-time gap into a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evidence {
    /// The higher-priority task completed fewer loops.
    ReducedWork {
        /// Loops of the higher-priority task.
        loops: u64,
        /// Loops of the lower-priority task.
        lower_loops: u64,
    },
    /// The higher-priority task started after the lower one finished.
    Serialized {
        /// Finish time of the lower-priority task.
        lower_finish: Duration,
    },
    /// The higher-priority task finished later by more than the tolerance.
    LateFinish {
        /// How much later it finished.
        lag: Duration,
    },
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReducedWork { loops, lower_loops } => {
                write!(f, "completed {loops} loops vs {lower_loops} for the lower task")
            }
            Self::Serialized { lower_finish } => write!(
                f,
                "started after the lower task finished at {}us",
                lower_finish.as_micros()
            ),
            Self::LateFinish { lag } => {
                write!(f, "finished {}us after the lower task", lag.as_micros())
            }
        }
    }
}

/// A priority-ordering violation found in one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    /// Iteration the row belongs to.
    pub iteration: usize,
    /// The higher-priority task that lagged.
    pub task: usize,
    /// Start-time gap to task `task - 1`.
    pub delay: Duration,
    /// Corroborating evidence.
    pub evidence: Evidence,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {}: task {} woke {}us after task {} and {}",
            self.iteration,
            self.task,
            self.delay.as_micros(),
            self.task.saturating_sub(1),
            self.evidence
        )
    }
}

/// Checks one row and returns the first violation, if any.
///
/// `row` must be in ascending task id order.
///
/// # Errors
///
/// Returns the [`Violation`] for the first corroborated pair.
pub fn check_row(iteration: usize, row: &[Sample], max_error: Duration) -> Result<(), Violation> {
    for (offset, pair) in row.windows(2).enumerate() {
        let (lower, higher) = (&pair[0], &pair[1]);
        let delay = higher.start.saturating_sub(lower.start);
        if delay <= max_error {
            continue;
        }
        let evidence = if higher.loops < lower.loops {
            Some(Evidence::ReducedWork {
                loops: higher.loops,
                lower_loops: lower.loops,
            })
        } else if higher.start > lower.finish {
            Some(Evidence::Serialized {
                lower_finish: lower.finish,
            })
        } else {
            let lag = higher.finish.saturating_sub(lower.finish);
            (lag > max_error).then_some(Evidence::LateFinish { lag })
        };
        if let Some(evidence) = evidence {
            return Err(Violation {
                iteration,
                task: offset + 1,
                delay,
                evidence,
            });
        }
        tracing::trace!(
            iteration,
            task = offset + 1,
            delay_us = delay.as_micros(),
            "start gap dismissed as noise"
        );
    }
    Ok(())
}

/// Per-row check run by the coordinator after every end barrier.
pub trait RowVerifier {
    /// Judges one row.
    ///
    /// # Errors
    ///
    /// Returns the violation that fails the row.
    fn verify(&self, iteration: usize, row: &[Sample]) -> Result<(), Violation>;
}

/// The default verifier: [`check_row`] with a fixed tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityOrderVerifier {
    max_error: Duration,
}

impl PriorityOrderVerifier {
    /// Creates a verifier with the given tolerance.
    #[must_use]
    pub const fn new(max_error: Duration) -> Self {
        Self { max_error }
    }
}

impl RowVerifier for PriorityOrderVerifier {
    fn verify(&self, iteration: usize, row: &[Sample]) -> Result<(), Violation> {
        check_row(iteration, row, self.max_error)
    }
}
