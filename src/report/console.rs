//! Plain-text run report.

use std::io::{self, Write};
use std::time::Duration;

use crate::harness::{RunOutcome, Verdict};

/// Column width of one task in the per-iteration table.
const COLUMN: usize = 6;

fn micros(duration: Duration) -> u128 {
    duration.as_micros()
}

/// Writes the report for `outcome`.
///
/// The per-iteration table lists, for every recorded iteration, each task's
/// start latency, its finish time (both relative to the release) and its
/// loop count. `quiet` leaves the table out and keeps the summary.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(out: &mut W, outcome: &RunOutcome, quiet: bool) -> io::Result<()> {
    let results = &outcome.results;
    let tasks = results.tasks();

    if !quiet {
        write!(out, "Iter: ")?;
        for task in 0..tasks {
            write!(out, "{task:>COLUMN$}  ")?;
        }
        writeln!(out)?;

        for (iteration, row) in results.rows().enumerate() {
            write!(out, "{iteration:>4}:   ")?;
            for sample in row {
                write!(out, "{:>COLUMN$}  ", micros(sample.start))?;
            }
            writeln!(out)?;
            write!(out, " len:   ")?;
            for sample in row {
                write!(out, "{:>COLUMN$}  ", micros(sample.finish))?;
            }
            writeln!(out)?;
            write!(out, " loops: ")?;
            for sample in row {
                write!(out, "{:>COLUMN$}  ", sample.loops)?;
            }
            writeln!(out)?;
            writeln!(out)?;
        }
    }

    writeln!(out, "Parent pid: {}", outcome.parent_pid)?;
    if !outcome.coordinator_priority_applied {
        writeln!(out, " (coordinator ran without real-time priority)")?;
    }

    for info in &outcome.tasks {
        let stats = results.task_stats(info.id);
        write!(out, " Task {} (prio {}) (pid {})", info.id, info.priority, info.tid)?;
        if info.migrates {
            write!(out, " [migrating]")?;
        }
        if !info.priority_applied {
            write!(out, " [degraded: no real-time priority]")?;
        }
        writeln!(out, ":")?;
        writeln!(out, "   Max: {} us", micros(stats.max))?;
        writeln!(out, "   Min: {} us", micros(stats.min))?;
        writeln!(out, "   Tot: {} us", micros(stats.total))?;
        writeln!(out, "   Avg: {} us", micros(stats.avg))?;
        writeln!(out)?;
    }

    if outcome.config.check {
        match outcome.verdict {
            Verdict::Fail => {
                if let Some(violation) = &outcome.violation {
                    writeln!(out, " {violation}")?;
                }
                writeln!(out, " Failed!")?;
            }
            Verdict::Pass | Verdict::Undecided => writeln!(out, " Passed!")?,
        }
    }
    Ok(())
}
