//! Durable append-only activity log port.

use crate::domain::error::MomtraderError;
use chrono::NaiveDateTime;

pub trait ActivityLog {
    /// Append one `<timestamp>: <summary>` line.
    fn append(&self, timestamp: NaiveDateTime, summary: &str) -> Result<(), MomtraderError>;
}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_line(timestamp: NaiveDateTime, summary: &str) -> String {
    format!("{}: {}", timestamp.format(TIMESTAMP_FORMAT), summary)
}
