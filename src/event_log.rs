//! Append-only event log.
//!
//! Each entry is a local timestamp line followed by a tab-indented description:
//!
//! ```text
//! Mon Oct 19 14:02:11 2026
//! 	shutdown
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use crate::domain::InactivityDuration;

/// Timestamp layout of the log (asctime style).
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Errors writing the event log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to write event log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Events recorded in the persistent log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// Periodic sample (verbose mode only).
    IdleSample(InactivityDuration),
    /// The user came back during the grace period.
    ShutdownCancelled,
    /// The shutdown was committed.
    ShutdownCommitted,
}

impl LogEvent {
    pub fn description(&self) -> String {
        match self {
            Self::IdleSample(idle) => format!("idle for {idle} minutes"),
            Self::ShutdownCancelled => "shutdown cancelled".to_string(),
            Self::ShutdownCommitted => "shutdown".to_string(),
        }
    }
}

/// Single-writer sink for log events.
pub trait EventLog: Send {
    fn append(&mut self, event: &LogEvent) -> Result<(), LogError>;
}

/// Format one entry with the given timestamp text.
pub fn format_entry(timestamp: &str, event: &LogEvent) -> String {
    format!("{timestamp}\n\t{}\n", event.description())
}

/// Event log stored in a text file, opened in append mode for every entry.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for FileEventLog {
    fn append(&mut self, event: &LogEvent) -> Result<(), LogError> {
        let wrap = |source: std::io::Error| LogError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(wrap)?;
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(wrap)?;
        file.write_all(format_entry(&timestamp, event).as_bytes())
            .map_err(wrap)
    }
}

/// Default log path: `$XDG_DATA_HOME/idle-shutdownd/log.txt`.
pub fn default_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("idle-shutdownd").join("log.txt"))
}
