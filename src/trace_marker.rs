//! Best-effort progress markers in the kernel ftrace buffer.
//!
//! When tracing is mounted, lines written to `trace_marker` show up inline
//! with scheduler events, which makes it easy to line up a failed iteration
//! with the wake-ups and migrations that caused it. Every failure here is
//! swallowed: a missing or unwritable marker file never affects the run.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Locations searched for the marker file, in order.
pub const MARKER_PATHS: [&str; 4] = [
    "/sys/kernel/tracing/trace_marker",
    "/sys/kernel/debug/tracing/trace_marker",
    "/debug/tracing/trace_marker",
    "/debugfs/tracing/trace_marker",
];

/// Writer for the ftrace marker file, or a no-op if none is available.
#[derive(Debug, Default)]
pub struct TraceMarker {
    file: Option<File>,
}

impl TraceMarker {
    /// Returns a marker that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Opens the first writable marker file from [`MARKER_PATHS`].
    #[must_use]
    pub fn discover() -> Self {
        MARKER_PATHS
            .iter()
            .map(Path::new)
            .find_map(|path| Self::open(path).ok())
            .unwrap_or_default()
    }

    /// Opens a specific marker file for appending.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened for writing.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        tracing::debug!(path = %path.display(), "trace marker enabled");
        Ok(Self {
            file: Some(file),
        })
    }

    /// Returns true if markers are actually written somewhere.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Writes one marker line. Errors are ignored.
    ///
    /// Each call is a single `write(2)`, so lines from different threads do
    /// not interleave.
    pub fn write(&self, args: fmt::Arguments<'_>) {
        let Some(mut file) = self.file.as_ref() else {
            return;
        };
        let mut line = args.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let _ = file.write_all(line.as_bytes());
    }
}

/// Writes a formatted line to a [`TraceMarker`].
#[macro_export]
macro_rules! trace_mark {
    ($marker:expr, $($arg:tt)*) => {
        $marker.write(format_args!($($arg)*))
    };
}
