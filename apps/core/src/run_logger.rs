//! Run Logger Module
//!
//! Records each classification run (CLI batch or server session) to a
//! `run.log` file: start/end timestamps, status, errors encountered, and
//! batch summaries. Only the last 10 runs are kept so the file stays
//! manageable.

use crate::fs_manager::PortablePathManager;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};

/// Maximum number of runs to keep in the log file.
const MAX_RUNS: usize = 10;

/// Name of the run log file.
const RUN_LOG_FILENAME: &str = "run.log";

/// A single recorded run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntry {
    /// Unique identifier for the run (timestamp-based).
    pub run_id: String,
    /// Start time of the run.
    pub start_time: DateTime<Local>,
    /// End time of the run (None if still running).
    pub end_time: Option<DateTime<Local>>,
    /// Status of the run: "running", "success", "failure".
    pub status: String,
    /// Errors encountered during the run.
    pub errors: Vec<ErrorEntry>,
    /// Batch summaries and other notes.
    pub info: Vec<String>,
}

/// An error that occurred during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

/// Global run logger instance.
static GLOBAL_LOGGER: Mutex<Option<RunLogger>> = Mutex::new(None);

pub struct RunLogger {
    current_run: RunEntry,
    log_path: PathBuf,
}

impl RunLogger {
    /// Starts tracking a new run and writes the "running" entry.
    pub fn start_run() -> Self {
        let now = Local::now();
        let run_id = format!("run_{}", now.format("%Y%m%d_%H%M%S"));

        let current_run = RunEntry {
            run_id: run_id.clone(),
            start_time: now,
            end_time: None,
            status: "running".to_string(),
            errors: Vec::new(),
            info: Vec::new(),
        };

        let logs_dir = PortablePathManager::logs_dir();
        if let Err(e) = fs::create_dir_all(&logs_dir) {
            error!("Failed to create logs directory: {}", e);
        }

        let mut logger = Self {
            current_run,
            log_path: logs_dir.join(RUN_LOG_FILENAME),
        };

        logger.log_info("Run started");
        logger.write_to_file();

        info!(run_id = %run_id, "Run logger started");
        logger
    }

    /// Initializes the global run logger. Call once at startup.
    pub fn init_global() {
        if let Ok(mut guard) = GLOBAL_LOGGER.lock() {
            *guard = Some(Self::start_run());
        }
    }

    pub fn log_info(&mut self, message: &str) {
        self.current_run.info.push(message.to_string());
    }

    pub fn log_error(&mut self, message: &str) {
        self.current_run.errors.push(ErrorEntry {
            timestamp: Local::now(),
            message: message.to_string(),
        });
        self.write_to_file();
    }

    /// Marks the run finished and persists the final entry.
    pub fn complete_run(&mut self, success: bool) {
        self.current_run.end_time = Some(Local::now());
        self.current_run.status = if success { "success" } else { "failure" }.to_string();
        self.write_to_file();
    }

    /// Rewrites the log file: previous entries (minus any stale copy of
    /// the current run), truncated to the retention cap, plus the current
    /// run as the last line. One JSON object per line.
    fn write_to_file(&mut self) {
        let mut entries = self.read_existing_entries();
        entries.retain(|entry| entry.run_id != self.current_run.run_id);

        if entries.len() >= MAX_RUNS {
            let drop = entries.len() + 1 - MAX_RUNS;
            entries.drain(..drop);
        }
        entries.push(self.current_run.clone());

        let mut lines = String::new();
        for entry in &entries {
            match serde_json::to_string(entry) {
                Ok(line) => {
                    lines.push_str(&line);
                    lines.push('\n');
                }
                Err(e) => error!("Failed to serialize run entry: {}", e),
            }
        }

        match fs::File::create(&self.log_path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(lines.as_bytes()) {
                    error!("Failed to write run log: {}", e);
                }
            }
            Err(e) => error!("Failed to open run log {:?}: {}", self.log_path, e),
        }
    }

    fn read_existing_entries(&self) -> Vec<RunEntry> {
        let Ok(content) = fs::read_to_string(&self.log_path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

/// Appends an info note to the global run, if initialized.
pub fn global_log_info(message: &str) {
    if let Ok(mut guard) = GLOBAL_LOGGER.lock() {
        if let Some(logger) = guard.as_mut() {
            logger.log_info(message);
        }
    }
}

/// Records an error against the global run, if initialized.
pub fn global_log_error(message: &str) {
    if let Ok(mut guard) = GLOBAL_LOGGER.lock() {
        if let Some(logger) = guard.as_mut() {
            logger.log_error(message);
        }
    }
}

/// Completes the global run, if initialized.
pub fn global_complete(success: bool) {
    if let Ok(mut guard) = GLOBAL_LOGGER.lock() {
        if let Some(logger) = guard.as_mut() {
            logger.complete_run(success);
        }
    }
}
