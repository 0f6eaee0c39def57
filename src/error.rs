//! Error types for the migration harness.
//!
//! Only conditions that make the run impossible are errors. An ordering
//! violation is a verdict, not an error, and failing to obtain a real-time
//! priority only degrades the run (see [`crate::harness::TaskInfo`]).
//!
//! # Error Categories
//!
//! - **Configuration**: rejected run parameters
//! - **Allocation**: the result matrices could not be reserved
//! - **Spawn**: a worker thread could not be created
//! - **Io**: reading or writing a report failed

use core::fmt;
use std::collections::TryReserveError;
use std::io;

use crate::config::ConfigError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid run parameters.
    Config,
    /// Result storage could not be allocated.
    Allocation,
    /// A worker thread could not be spawned.
    Spawn,
    /// A worker thread panicked.
    WorkerPanicked,
    /// I/O failure outside the measurement loop.
    Io,
}

impl ErrorKind {
    /// Returns a short machine-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Allocation => "allocation",
            Self::Spawn => "spawn",
            Self::WorkerPanicked => "worker_panicked",
            Self::Io => "io",
        }
    }
}

/// Error returned by the harness.
#[derive(Debug)]
pub enum Error {
    /// The configuration was rejected.
    Config(ConfigError),
    /// Reserving the result matrices failed.
    Allocation {
        /// Number of cells that were requested.
        cells: usize,
        /// Allocator error.
        source: TryReserveError,
    },
    /// Spawning a worker thread failed.
    Spawn {
        /// Task id of the worker.
        task: usize,
        /// Underlying OS error.
        source: io::Error,
    },
    /// A worker thread panicked and could not be joined cleanly.
    WorkerPanicked {
        /// Task id of the worker.
        task: usize,
    },
    /// An I/O error outside the measurement loop.
    Io(io::Error),
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::Spawn { .. } => ErrorKind::Spawn,
            Self::WorkerPanicked { .. } => ErrorKind::WorkerPanicked,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Allocation { cells, source } => {
                write!(f, "cannot allocate {cells} result cells: {source}")
            }
            Self::Spawn { task, source } => write!(f, "cannot spawn task {task}: {source}"),
            Self::WorkerPanicked { task } => write!(f, "task {task} panicked"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Allocation { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
            Self::WorkerPanicked { .. } => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
