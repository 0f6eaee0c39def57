//! Run reports: the human-readable console summary and the JSON file.

mod console;
mod json;

pub use console::write_report;
pub use json::{FILE_VERSION, JsonSummary, SysInfo, ThreadSummary, format_timestamp};
