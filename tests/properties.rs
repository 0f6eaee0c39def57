//! Property tests for the ordering verifier, priority derivation and
//! duration parsing.

mod common;

use std::time::Duration;

use proptest::prelude::*;
use rt_migrate::config::{MigrateConfig, parse_duration};
use rt_migrate::harness::{Evidence, Sample, Verdict, check_row};

const TOLERANCE: Duration = Duration::from_micros(1000);

fn sample(start: u64, run: u64, loops: u64) -> Sample {
    Sample::from_micros(start, start + run, loops)
}

proptest! {
    /// Start gaps inside the tolerance never fail, whatever the loop counts.
    #[test]
    fn gaps_within_tolerance_always_pass(
        first in 0u64..100_000,
        gaps in prop::collection::vec(0u64..=1000, 1..8),
        runs in prop::collection::vec(1u64..50_000, 8),
        loops in prop::collection::vec(1u64..1_000_000, 8),
    ) {
        common::init_test_logging();
        let mut start = first;
        let mut row = vec![sample(start, runs[0], loops[0])];
        for (i, gap) in gaps.iter().enumerate() {
            start += gap;
            row.push(sample(start, runs[i + 1], loops[i + 1]));
        }
        prop_assert!(check_row(0, &row, TOLERANCE).is_ok());
    }

    /// A higher task that starts earlier is never blamed.
    #[test]
    fn earlier_higher_start_always_passes(
        lower_start in 1_000u64..100_000,
        lead in 1u64..1_000,
        runs in (1u64..50_000, 1u64..50_000),
        loops in (1u64..1_000, 1u64..1_000),
    ) {
        let row = [
            sample(lower_start, runs.0, loops.0),
            sample(lower_start - lead, runs.1, loops.1),
        ];
        prop_assert!(check_row(0, &row, TOLERANCE).is_ok());
    }

    /// A higher task that wakes only after the lower one finished fails.
    #[test]
    fn serialized_pair_always_fails(
        lower_start in 0u64..10_000,
        lower_run in 1u64..20_000,
        wait in 1_001u64..50_000,
        loops in 1u64..1_000,
    ) {
        let lower = sample(lower_start, lower_run, loops);
        let higher_start = (lower_start + lower_run).max(lower_start + wait) + 1;
        let row = [lower, sample(higher_start, lower_run, loops)];
        let violation = check_row(4, &row, TOLERANCE).expect_err("must fail");
        prop_assert_eq!(violation.iteration, 4);
        prop_assert_eq!(violation.task, 1);
        prop_assert!(violation.delay > TOLERANCE);
        prop_assert!(matches!(violation.evidence, Evidence::Serialized { .. }), "expected serialized evidence");
    }

    /// Once failed, the verdict never recovers.
    #[test]
    fn verdict_never_recovers(rows in prop::collection::vec(any::<bool>(), 1..64)) {
        let mut verdict = Verdict::default();
        let mut failed = false;
        for passed in rows {
            verdict.absorb(passed);
            failed |= !passed;
            prop_assert_eq!(verdict.is_fail(), failed);
        }
        prop_assert_ne!(verdict, Verdict::Undecided);
    }

    /// Strict mode gives consecutive priorities; equal mode collapses the
    /// interior and keeps both ends distinct.
    #[test]
    fn priority_derivation(tasks in 1usize..64, base in 1i32..20, equal in any::<bool>()) {
        let config = MigrateConfig::new(tasks)
            .with_base_priority(base)
            .with_equal_priority(equal);
        let prios = config.priorities();
        prop_assert_eq!(prios.len(), tasks);
        prop_assert_eq!(prios[0], base);
        prop_assert_eq!(prios[tasks - 1], base + i32::try_from(tasks - 1).unwrap_or(i32::MAX));
        prop_assert_eq!(config.coordinator_priority(), base + i32::try_from(tasks).unwrap_or(i32::MAX));
        if equal && tasks > 2 {
            prop_assert!(prios[1..tasks - 1].iter().all(|p| *p == base + 1));
        } else {
            prop_assert!(prios.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    /// Every positive amount with a known suffix parses to the right length.
    #[test]
    fn duration_suffixes(amount in 1u64..100_000, unit in 0usize..5) {
        let (suffix, secs) = [("", 1), ("s", 1), ("m", 60), ("h", 3600), ("d", 86_400)][unit];
        let parsed = parse_duration(&format!("{amount}{suffix}")).expect("valid duration");
        prop_assert_eq!(parsed, Duration::from_secs(amount * secs));
    }
}

#[test]
fn duration_rejects_garbage_and_zero() {
    common::init_test_logging();
    test_phase!("Duration rejects");
    for bad in ["", "0", "0m", "m", "-5", "1.5h", "5w", "12 m x"] {
        assert!(parse_duration(bad).is_err(), "{bad:?} must be rejected");
    }
    test_complete!("duration_rejects");
}
