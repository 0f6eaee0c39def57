//! Structured error messages for `rt-migrate-test`.
//!
//! Follows RFC 9457 (Problem Details) style for machine-readable errors
//! with human-friendly formatting.

use super::exit::ExitCode;
use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured error following RFC 9457 (Problem Details) style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliError {
    /// Error type identifier (machine-readable).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short human-readable title.
    pub title: String,

    /// Detailed explanation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,

    /// Suggested action for recovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Additional context (varies by error type).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,

    /// Exit code for this error.
    pub exit_code: i32,
}

impl CliError {
    /// Create a new CLI error.
    #[must_use]
    pub fn new(error_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            title: title.into(),
            detail: String::new(),
            suggestion: None,
            context: BTreeMap::new(),
            exit_code: ExitCode::RUNTIME_ERROR,
        }
    }

    /// Add detailed explanation.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a suggested recovery action.
    #[must_use]
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add context field.
    #[must_use]
    pub fn context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Set exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Format for human output.
    #[must_use]
    pub fn human_format(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("Error: {}\n", self.title);
        if !self.detail.is_empty() {
            out.push_str(&self.detail);
            out.push('\n');
        }
        if let Some(ref suggestion) = self.suggestion {
            let _ = write!(out, "\nSuggestion: {suggestion}\n");
        }
        if !self.context.is_empty() {
            out.push_str("\nContext:\n");
            for (k, v) in &self.context {
                let _ = writeln!(out, "  {k}: {v}");
            }
        }
        out
    }

    /// Format as JSON.
    #[must_use]
    pub fn json_format(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.title.clone())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.title)
    }
}

impl std::error::Error for CliError {}

impl From<&Error> for CliError {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(config) => errors::invalid_config(&config.to_string()),
            Error::Allocation { cells, .. } => {
                CliError::new("allocation_failed", "Cannot allocate result storage")
                    .detail(err.to_string())
                    .suggestion("Reduce the task count or the number of loops")
                    .context("cells", cells)
            }
            Error::Spawn { task, .. } => CliError::new("spawn_failed", "Cannot start worker thread")
                .detail(err.to_string())
                .context("task", task),
            Error::WorkerPanicked { task } => {
                CliError::new("worker_panicked", "Worker thread panicked")
                    .detail(err.to_string())
                    .context("task", task)
            }
            Error::Io(_) => CliError::new("io_error", "I/O error").detail(err.to_string()),
        }
        .context("kind", err.kind().as_str())
        .exit_code(match err.kind() {
            ErrorKind::Config => ExitCode::USER_ERROR,
            _ => ExitCode::RUNTIME_ERROR,
        })
    }
}

/// Standard error constructors.
pub mod errors {
    use super::{CliError, ExitCode};

    /// Invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: &str) -> CliError {
        CliError::new("invalid_config", "Invalid configuration")
            .detail(reason)
            .exit_code(ExitCode::USER_ERROR)
    }

    /// The JSON summary could not be written.
    #[must_use]
    pub fn report_write_failed(path: &str, reason: &str) -> CliError {
        CliError::new("report_write_failed", "Cannot write JSON summary")
            .detail(reason)
            .suggestion("Check that the directory exists and is writable")
            .context("path", path)
            .exit_code(ExitCode::RUNTIME_ERROR)
    }
}
