//! Run parameters for the migration harness.
//!
//! [`MigrateConfig`] is built once (from the command line or by a caller),
//! validated, and then shared read-only with every thread of the run.
//!
//! Priorities are derived from the task id: task `i` runs at
//! `base_priority + rank(i)`. In equal-priority mode all interior tasks share
//! one band while task 0 keeps the lowest and the last task keeps the
//! strictly highest priority.

use std::time::Duration;

/// Default busy-work duration per task per iteration.
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_millis(20);

/// Default idle time before and after each release.
pub const DEFAULT_IDLE_DURATION: Duration = Duration::from_millis(100);

/// Default tolerance before a start-time gap is considered suspicious.
pub const DEFAULT_MAX_ERROR: Duration = Duration::from_micros(1000);

/// Default number of iterations.
pub const DEFAULT_ITERATIONS: usize = 50;

/// Default SCHED_FIFO priority of task 0.
pub const DEFAULT_BASE_PRIORITY: i32 = 2;

/// Immutable parameters of one harness run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    /// Number of worker tasks (one per priority level).
    pub task_count: usize,
    /// Priority of task 0.
    pub base_priority: i32,
    /// Collapse interior tasks into a single priority band.
    pub equal_priority: bool,
    /// Wall-clock time each worker spins per iteration.
    pub run_duration: Duration,
    /// Coordinator idle time before and after each release.
    pub idle_duration: Duration,
    /// Start-time gap tolerated as scheduling noise.
    pub max_error: Duration,
    /// Requested number of iterations.
    pub iterations: usize,
    /// Optional cap on the total run time.
    pub wall_clock_limit: Option<Duration>,
    /// Run the ordering verifier after every iteration.
    pub check: bool,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self::new(default_task_count())
    }
}

impl MigrateConfig {
    /// Creates a configuration for `task_count` workers with default timings.
    #[must_use]
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count,
            base_priority: DEFAULT_BASE_PRIORITY,
            equal_priority: false,
            run_duration: DEFAULT_RUN_DURATION,
            idle_duration: DEFAULT_IDLE_DURATION,
            max_error: DEFAULT_MAX_ERROR,
            iterations: DEFAULT_ITERATIONS,
            wall_clock_limit: None,
            check: false,
        }
    }

    /// Sets the priority of task 0.
    #[must_use]
    pub const fn with_base_priority(mut self, priority: i32) -> Self {
        self.base_priority = priority;
        self
    }

    /// Enables or disables the equal-priority band.
    #[must_use]
    pub const fn with_equal_priority(mut self, equal: bool) -> Self {
        self.equal_priority = equal;
        self
    }

    /// Sets the busy-work duration.
    #[must_use]
    pub const fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = duration;
        self
    }

    /// Sets the idle duration.
    #[must_use]
    pub const fn with_idle_duration(mut self, duration: Duration) -> Self {
        self.idle_duration = duration;
        self
    }

    /// Sets the noise tolerance.
    #[must_use]
    pub const fn with_max_error(mut self, max_error: Duration) -> Self {
        self.max_error = max_error;
        self
    }

    /// Sets the iteration count.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Caps the total run time.
    #[must_use]
    pub const fn with_wall_clock_limit(mut self, limit: Option<Duration>) -> Self {
        self.wall_clock_limit = limit;
        self
    }

    /// Enables or disables the per-iteration ordering check.
    #[must_use]
    pub const fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Returns the rank of task `id` above the base priority.
    #[must_use]
    pub fn rank(&self, id: usize) -> i32 {
        let rank = if self.equal_priority && id > 0 && id + 1 < self.task_count {
            1
        } else {
            id
        };
        i32::try_from(rank).unwrap_or(i32::MAX)
    }

    /// Returns the SCHED_FIFO priority of task `id`.
    #[must_use]
    pub fn priority(&self, id: usize) -> i32 {
        self.base_priority.saturating_add(self.rank(id))
    }

    /// Returns the priorities of all tasks in id order.
    #[must_use]
    pub fn priorities(&self) -> Vec<i32> {
        (0..self.task_count).map(|id| self.priority(id)).collect()
    }

    /// Returns the id of the highest-priority task, the one that migrates.
    #[must_use]
    pub fn highest_task(&self) -> usize {
        self.task_count.saturating_sub(1)
    }

    /// Returns the priority the coordinator runs at, above every worker.
    #[must_use]
    pub fn coordinator_priority(&self) -> i32 {
        let count = i32::try_from(self.task_count).unwrap_or(i32::MAX);
        self.base_priority.saturating_add(count)
    }

    /// Returns true when equal-priority mode was requested but there are no
    /// interior tasks to put in the shared band.
    #[must_use]
    pub fn equal_priority_is_noop(&self) -> bool {
        self.equal_priority && self.task_count <= 2
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_count == 0 {
            return Err(ConfigError::NoTasks);
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.run_duration.is_zero() {
            return Err(ConfigError::ZeroRunDuration);
        }
        if self.base_priority < 0 {
            return Err(ConfigError::NegativePriority(self.base_priority));
        }
        if matches!(self.wall_clock_limit, Some(limit) if limit.is_zero()) {
            return Err(ConfigError::InvalidDuration("0".to_string()));
        }
        Ok(())
    }
}

/// Errors produced while building or validating a [`MigrateConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// At least one worker task is required.
    NoTasks,
    /// At least one iteration is required.
    NoIterations,
    /// The busy-work duration must be positive.
    ZeroRunDuration,
    /// Priorities cannot be negative.
    NegativePriority(i32),
    /// A duration string could not be parsed.
    InvalidDuration(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTasks => write!(f, "task count must be at least 1"),
            Self::NoIterations => write!(f, "iteration count must be at least 1"),
            Self::ZeroRunDuration => write!(f, "run time must be greater than zero"),
            Self::NegativePriority(prio) => write!(f, "base priority {prio} is negative"),
            Self::InvalidDuration(value) => write!(
                f,
                "invalid duration '{value}' (expected a positive number with optional s/m/h/d suffix)"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parses a run-length string such as `90`, `30s`, `5m`, `2h` or `1d`.
///
/// A bare number is seconds. Zero and overflowing values are rejected.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDuration`] if the string is malformed.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let unit: u64 = match suffix.to_ascii_lowercase().as_str() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    let secs = amount.checked_mul(unit).ok_or_else(invalid)?;
    if secs == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(secs))
}

/// Returns the default task count: one more than the number of online CPUs.
#[must_use]
pub fn default_task_count() -> usize {
    crate::sched::online_cpus() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn priorities_increase_by_task_id() {
        init_test("priorities_increase_by_task_id");
        let config = MigrateConfig::new(4).with_base_priority(2);
        let prios = config.priorities();
        crate::assert_with_log!(prios == [2, 3, 4, 5], "priorities", [2, 3, 4, 5], prios);
        crate::test_complete!("priorities_increase_by_task_id");
    }

    #[test]
    fn equal_mode_bands_interior_tasks() {
        init_test("equal_mode_bands_interior_tasks");
        let config = MigrateConfig::new(4)
            .with_base_priority(2)
            .with_equal_priority(true);
        let prios = config.priorities();
        crate::assert_with_log!(prios == [2, 3, 3, 5], "priorities", [2, 3, 3, 5], prios);

        let wide = MigrateConfig::new(6).with_equal_priority(true);
        assert_eq!(wide.priorities(), vec![2, 3, 3, 3, 3, 7]);
        crate::test_complete!("equal_mode_bands_interior_tasks");
    }

    #[test]
    fn equal_mode_with_two_tasks_is_noop() {
        init_test("equal_mode_with_two_tasks_is_noop");
        for count in 1..=2 {
            let plain = MigrateConfig::new(count);
            let equal = MigrateConfig::new(count).with_equal_priority(true);
            assert_eq!(plain.priorities(), equal.priorities());
            assert!(equal.equal_priority_is_noop());
        }
        assert!(!MigrateConfig::new(3).with_equal_priority(true).equal_priority_is_noop());
        crate::test_complete!("equal_mode_with_two_tasks_is_noop");
    }

    #[test]
    fn coordinator_runs_above_every_worker() {
        init_test("coordinator_runs_above_every_worker");
        let config = MigrateConfig::new(5).with_base_priority(10);
        let max = config.priorities().into_iter().max().unwrap_or_default();
        assert!(config.coordinator_priority() > max);
        assert_eq!(config.highest_task(), 4);
        crate::test_complete!("coordinator_runs_above_every_worker");
    }

    #[test]
    fn defaults_match_documented_values() {
        init_test("defaults_match_documented_values");
        let config = MigrateConfig::new(3);
        assert_eq!(config.run_duration, Duration::from_millis(20));
        assert_eq!(config.idle_duration, Duration::from_millis(100));
        assert_eq!(config.max_error, Duration::from_micros(1000));
        assert_eq!(config.iterations, 50);
        assert_eq!(config.base_priority, 2);
        assert!(!config.check);
        assert!(config.wall_clock_limit.is_none());
        assert!(MigrateConfig::default().task_count >= 2);
        crate::test_complete!("defaults_match_documented_values");
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        init_test("validate_rejects_degenerate_values");
        assert_eq!(MigrateConfig::new(0).validate(), Err(ConfigError::NoTasks));
        assert_eq!(
            MigrateConfig::new(2).with_iterations(0).validate(),
            Err(ConfigError::NoIterations)
        );
        assert_eq!(
            MigrateConfig::new(2)
                .with_run_duration(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroRunDuration)
        );
        assert_eq!(
            MigrateConfig::new(2).with_base_priority(-1).validate(),
            Err(ConfigError::NegativePriority(-1))
        );
        assert!(MigrateConfig::new(2).validate().is_ok());
        crate::test_complete!("validate_rejects_degenerate_values");
    }

    #[test]
    fn parse_duration_accepts_suffixes() {
        init_test("parse_duration_accepts_suffixes");
        assert_eq!(parse_duration("90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1D"), Ok(Duration::from_secs(86_400)));
        assert_eq!(parse_duration(" 3m "), Ok(Duration::from_secs(180)));
        crate::test_complete!("parse_duration_accepts_suffixes");
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        init_test("parse_duration_rejects_garbage");
        for bad in ["", "m", "10x", "1.5h", "-3", "0", "0m", "99999999999999999999d"] {
            let result = parse_duration(bad);
            crate::assert_with_log!(result.is_err(), "rejects input", bad, result);
        }
        crate::test_complete!("parse_duration_rejects_garbage");
    }
}
