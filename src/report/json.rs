//! Machine-readable run summary.
//!
//! ```json
//! {
//!   "file_version": 1,
//!   "cmdline": "rt-migrate-test -c 4",
//!   "rt_test_version": "0.1.0",
//!   "start_time": "2026-01-02T03:04:05Z",
//!   "end_time": "2026-01-02T03:04:11Z",
//!   "return_code": 0,
//!   "sysinfo": { "sysname": "Linux", "nodename": "...", "release": "...",
//!                "version": "...", "machine": "x86_64" },
//!   "num_threads": 4,
//!   "iterations": 50,
//!   "verdict": "pass",
//!   "thread": { "0": { "prio": 2, "min": 11, "avg": 14, "max": 30, "total": 700 } }
//! }
//! ```
//!
//! Latency values are start latencies in microseconds.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::harness::RunOutcome;

/// Layout version of the summary file.
pub const FILE_VERSION: u32 = 1;

/// Kernel identification as reported by `uname(2)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysInfo {
    /// Operating system name.
    pub sysname: String,
    /// Host name.
    pub nodename: String,
    /// Kernel release.
    pub release: String,
    /// Kernel version string.
    pub version: String,
    /// Hardware identifier.
    pub machine: String,
}

impl SysInfo {
    /// Reads the running kernel's identification. Fields that cannot be
    /// read are left empty.
    #[must_use]
    pub fn current() -> Self {
        uname().unwrap_or_else(|err| {
            tracing::debug!(error = %err, "uname failed");
            Self::default()
        })
    }
}

#[cfg(unix)]
fn uname() -> io::Result<SysInfo> {
    fn field(raw: &[libc::c_char]) -> String {
        let bytes: Vec<u8> = raw
            .iter()
            .take_while(|c| **c != 0)
            .map(|c| c.to_ne_bytes()[0])
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    // SAFETY: utsname is plain old data and uname only writes into it.
    let mut info: libc::utsname = unsafe { std::mem::zeroed() };
    // SAFETY: `info` is a valid, writable utsname.
    if unsafe { libc::uname(&raw mut info) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(SysInfo {
        sysname: field(&info.sysname),
        nodename: field(&info.nodename),
        release: field(&info.release),
        version: field(&info.version),
        machine: field(&info.machine),
    })
}

#[cfg(not(unix))]
fn uname() -> io::Result<SysInfo> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "uname"))
}

/// Formats `time` as an RFC 3339 UTC timestamp with second precision.
#[must_use]
pub fn format_timestamp(time: SystemTime) -> String {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_secs());
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        rem / 3600,
        rem % 3600 / 60,
        rem % 60
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

/// Start-latency summary of one task, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// SCHED_FIFO priority the task asked for.
    pub prio: i32,
    /// Smallest start latency.
    pub min: u64,
    /// `total / iterations`.
    pub avg: u64,
    /// Largest start latency.
    pub max: u64,
    /// Sum over all recorded iterations.
    pub total: u64,
}

/// The full JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Layout version, see [`FILE_VERSION`].
    pub file_version: u32,
    /// Command line the run was started with.
    pub cmdline: String,
    /// Version of this tool.
    pub rt_test_version: String,
    /// Wall-clock start of the run.
    pub start_time: String,
    /// Wall-clock end of the run.
    pub end_time: String,
    /// Process exit status.
    pub return_code: i32,
    /// Kernel identification.
    pub sysinfo: SysInfo,
    /// Number of worker tasks.
    pub num_threads: usize,
    /// Number of recorded iterations.
    pub iterations: usize,
    /// `undecided`, `pass` or `fail`.
    pub verdict: String,
    /// Per-task summaries keyed by task id.
    pub thread: BTreeMap<String, ThreadSummary>,
}

fn micros(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl JsonSummary {
    /// Builds the summary for a finished run.
    #[must_use]
    pub fn new(
        outcome: &RunOutcome,
        cmdline: impl Into<String>,
        start: SystemTime,
        end: SystemTime,
        return_code: i32,
    ) -> Self {
        let iterations = outcome.results.iterations();
        let thread = (0..outcome.config.task_count)
            .map(|id| {
                let stats = outcome.results.task_stats(id);
                let total = micros(stats.total);
                let summary = ThreadSummary {
                    prio: outcome.config.priority(id),
                    min: micros(stats.min),
                    avg: total / u64::try_from(iterations.max(1)).unwrap_or(u64::MAX),
                    max: micros(stats.max),
                    total,
                };
                (id.to_string(), summary)
            })
            .collect();

        Self {
            file_version: FILE_VERSION,
            cmdline: cmdline.into(),
            rt_test_version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: format_timestamp(start),
            end_time: format_timestamp(end),
            return_code,
            sysinfo: SysInfo::current(),
            num_threads: outcome.config.task_count,
            iterations,
            verdict: outcome.verdict.as_str().to_string(),
            thread,
        }
    }

    /// Writes the summary as pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()
    }

    /// Creates (or truncates) `path` and writes the summary to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        tracing::debug!(path = %path.display(), "wrote JSON summary");
        Ok(())
    }
}
