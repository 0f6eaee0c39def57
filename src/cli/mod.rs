//! Command-line plumbing shared by the binary: semantic exit codes,
//! structured errors and the progress bar.

pub mod error;
pub mod exit;
pub mod progress;

pub use error::{CliError, errors};
pub use exit::ExitCode;
pub use progress::ProgressBar;
