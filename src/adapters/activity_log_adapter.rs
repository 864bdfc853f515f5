//! Append-only text file activity log.

use crate::domain::error::MomtraderError;
use crate::ports::activity_log_port::{format_line, ActivityLog};
use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_ACTIVITY_LOG: &str = "rebalancing_log.txt";

/// Reopened in append mode on every call; existing lines are kept.
pub struct FileActivityLog {
    path: PathBuf,
}

impl FileActivityLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ActivityLog for FileActivityLog {
    fn append(&self, timestamp: NaiveDateTime, summary: &str) -> Result<(), MomtraderError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_line(timestamp, summary))?;
        Ok(())
    }
}
