//! Semantic exit codes for `rt-migrate-test`.
//!
//! Codes stay in the portable range (0-125); 126-255 are reserved by shells.

use crate::harness::{RunOutcome, StopReason};

/// Semantic exit codes.
pub struct ExitCode;

impl ExitCode {
    /// The run completed without an ordering violation.
    pub const SUCCESS: i32 = 0;

    /// Bad arguments or an invalid configuration.
    pub const USER_ERROR: i32 = 1;

    /// Fatal startup failure or report write failure.
    pub const RUNTIME_ERROR: i32 = 2;

    /// Stopped early by a signal or the wall-clock cap.
    pub const CANCELLED: i32 = 4;

    /// The ordering check found a violation.
    pub const ORDERING_VIOLATION: i32 = 10;

    /// Get human-readable description of an exit code.
    #[must_use]
    pub const fn description(code: i32) -> &'static str {
        match code {
            0 => "success",
            1 => "user error (invalid input/arguments)",
            2 => "runtime error",
            4 => "cancelled",
            10 => "priority ordering violation",
            _ => "unknown",
        }
    }

    /// Maps a finished run onto an exit code. A violation wins over an
    /// early stop.
    #[must_use]
    pub fn for_outcome(outcome: &RunOutcome) -> i32 {
        if outcome.verdict.is_fail() {
            return Self::ORDERING_VIOLATION;
        }
        match outcome.stop_reason {
            StopReason::Completed => Self::SUCCESS,
            StopReason::OrderingViolation => Self::ORDERING_VIOLATION,
            StopReason::Interrupted(_) | StopReason::DeadlineReached => Self::CANCELLED,
        }
    }

    /// Check if an exit code indicates success (code 0).
    #[must_use]
    pub const fn is_success(code: i32) -> bool {
        code == Self::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrateConfig;
    use crate::harness::{RunResults, Verdict};
    use crate::signal::{SignalKind, StopCause};
    use std::collections::HashSet;
    use std::time::Duration;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    const ALL: [i32; 5] = [
        ExitCode::SUCCESS,
        ExitCode::USER_ERROR,
        ExitCode::RUNTIME_ERROR,
        ExitCode::CANCELLED,
        ExitCode::ORDERING_VIOLATION,
    ];

    fn outcome(verdict: Verdict, stop_reason: StopReason) -> RunOutcome {
        RunOutcome {
            config: MigrateConfig::new(2),
            verdict,
            violation: None,
            stop_reason,
            results: RunResults::default(),
            tasks: Vec::new(),
            parent_pid: 1,
            coordinator_priority_applied: true,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn exit_codes_are_distinct_and_in_range() {
        init_test("exit_codes_are_distinct_and_in_range");
        let unique: HashSet<_> = ALL.iter().collect();
        crate::assert_with_log!(unique.len() == ALL.len(), "unique codes", ALL.len(), unique.len());
        for code in ALL {
            crate::assert_with_log!((0..=125).contains(&code), "code in range", "0..=125", code);
            crate::assert_with_log!(
                ExitCode::description(code) != "unknown",
                "described",
                "known",
                ExitCode::description(code)
            );
        }
        assert_eq!(ExitCode::description(3), "unknown");
        assert!(ExitCode::is_success(0));
        assert!(!ExitCode::is_success(4));
        crate::test_complete!("exit_codes_are_distinct_and_in_range");
    }

    #[test]
    fn outcome_mapping() {
        init_test("outcome_mapping");
        let cases = [
            (Verdict::Undecided, StopReason::Completed, ExitCode::SUCCESS),
            (Verdict::Pass, StopReason::Completed, ExitCode::SUCCESS),
            (Verdict::Fail, StopReason::OrderingViolation, ExitCode::ORDERING_VIOLATION),
            (
                Verdict::Pass,
                StopReason::Interrupted(StopCause::Signal(SignalKind::Interrupt)),
                ExitCode::CANCELLED,
            ),
            (Verdict::Undecided, StopReason::DeadlineReached, ExitCode::CANCELLED),
            (Verdict::Fail, StopReason::DeadlineReached, ExitCode::ORDERING_VIOLATION),
        ];
        for (verdict, reason, expected) in cases {
            let code = ExitCode::for_outcome(&outcome(verdict, reason));
            crate::assert_with_log!(code == expected, "exit code", expected, code);
        }
        crate::test_complete!("outcome_mapping");
    }
}
