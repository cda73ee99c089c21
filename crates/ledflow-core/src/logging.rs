//! Logging configuration
//!
//! Describes where logs go; the binary turns this into a `tracing` subscriber.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Prefix of every log file name
const LOG_FILE_PREFIX: &str = "ledflow";

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name (trace, debug, info, warn, error, off)
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Number of log files to keep
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_files: 10,
        }
    }
}

impl LogConfig {
    /// Parse `level`, falling back to INFO
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Create the log directory if file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Delete the oldest log files so that at most `max_files - 1` remain,
    /// leaving room for the one about to be created.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.file_output || !self.log_directory.exists() {
            return Ok(0);
        }
        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
            })
            .collect();
        // Timestamped names sort chronologically
        logs.sort();
        let keep = self.max_files.saturating_sub(1);
        let excess = logs.len().saturating_sub(keep);
        for path in logs.iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }

    /// Path of a new log file stamped with the current local time
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.log_directory
            .join(format!("{}_{}.log", LOG_FILE_PREFIX, stamp))
    }
}
