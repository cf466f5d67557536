//! Progress reporting for scrape passes
//!
//! Messages are written to stderr as one JSON object per line so a calling
//! process can follow a long pass.

use serde::Serialize;
use std::cell::Cell;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::config::ScanConfig;
use crate::error::ScrapeError;
use crate::models::ScanResult;

/// Running counters of a pass
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Media files visited so far
    pub files: u64,
    /// Files skipped by the exclusion list
    pub excluded: u64,
    /// Files handed to the host chain
    pub scraped: u64,
    /// Files recognition could not identify
    pub unrecognized: u64,
    /// File currently being processed
    pub current: String,
    /// Elapsed time in milliseconds
    pub elapsed_ms: u64,
}

/// Start message sent when a pass begins
#[derive(Debug, Clone, Serialize)]
pub struct StartMessage {
    /// Message type identifier
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Library roots
    pub paths: Vec<String>,
    /// Scrape mode value
    pub mode: &'static str,
    /// Lookback window of the cleaner
    pub offset_days: i64,
}

/// Progress message sent during a pass
#[derive(Debug, Clone, Serialize)]
pub struct ProgressMessage {
    /// Message type identifier ("p" for progress)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Files visited
    #[serde(rename = "f")]
    pub files: u64,
    /// Files excluded
    #[serde(rename = "x")]
    pub excluded: u64,
    /// Files scraped
    #[serde(rename = "s")]
    pub scraped: u64,
    /// Files not recognized
    #[serde(rename = "u")]
    pub unrecognized: u64,
    /// Current file
    pub file: String,
    /// Elapsed time in milliseconds
    pub ms: u64,
}

/// Error message sent when a file or directory fails
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProgressMessage {
    /// Message type identifier ("err" for error)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Error type/category
    pub error_type: String,
    /// Error message description
    pub message: String,
    /// Path that caused the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Done message sent when a pass finishes
#[derive(Debug, Clone, Serialize)]
pub struct DoneMessage {
    /// Message type identifier ("done" for completion)
    #[serde(rename = "_t")]
    pub msg_type: &'static str,
    /// Sequence number
    pub seq: u64,
    /// Timestamp in milliseconds since reporter creation
    pub ts: u64,
    /// Files visited
    #[serde(rename = "tf")]
    pub total_files: u64,
    /// Files scraped
    #[serde(rename = "sf")]
    pub scraped_files: usize,
    /// Sidecars removed
    #[serde(rename = "rn")]
    pub removed_nfos: u64,
    /// Whether the pass was cancelled
    pub cancelled: bool,
    /// Number of errors encountered
    #[serde(rename = "ec")]
    pub error_count: usize,
    /// Total duration in milliseconds
    pub ms: u64,
}

/// Progress reporter for outputting pass progress to stderr
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Reporting interval in milliseconds
    interval_ms: u64,
    /// Last report time
    last_report: Cell<Instant>,
    /// Sequence number for messages
    seq: AtomicU64,
    /// Start time of the reporter
    start_time: Instant,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(false, 500)
    }
}

impl ProgressReporter {
    /// Create a new ProgressReporter
    ///
    /// # Arguments
    /// * `enabled` - Whether progress reporting is enabled
    /// * `interval_ms` - Minimum interval between progress messages in milliseconds
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            interval_ms,
            last_report: Cell::new(now),
            seq: AtomicU64::new(0),
            start_time: now,
        }
    }

    /// Check if the reporter is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if enough time has passed since the last report
    pub fn should_report(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let elapsed = self.last_report.get().elapsed().as_millis() as u64;
        elapsed >= self.interval_ms
    }

    /// Get the next sequence number (monotonically increasing)
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the current timestamp in milliseconds since reporter creation
    pub fn current_timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    fn emit<T: Serialize>(&self, msg: &T) {
        if let Ok(json) = serde_json::to_string(msg) {
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "{}", json).ok();
            stderr.flush().ok();
        }
    }

    /// Report pass start
    pub fn report_start(&self, config: &ScanConfig) {
        if !self.enabled {
            return;
        }
        let msg = StartMessage {
            msg_type: "start",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            paths: config
                .paths
                .iter()
                .map(|p| p.path.to_string_lossy().to_string())
                .collect(),
            mode: config.mode.as_str(),
            offset_days: config.offset_days,
        };
        self.emit(&msg);
    }

    /// Report pass progress
    ///
    /// Returns true if a message was actually sent (respects interval timing).
    pub fn report_progress(&self, progress: &ScanProgress) -> bool {
        if !self.should_report() {
            return false;
        }
        let msg = ProgressMessage {
            msg_type: "p",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            files: progress.files,
            excluded: progress.excluded,
            scraped: progress.scraped,
            unrecognized: progress.unrecognized,
            file: progress.current.clone(),
            ms: progress.elapsed_ms,
        };
        self.emit(&msg);
        self.last_report.set(Instant::now());
        true
    }

    /// Report an error immediately (ignores interval timing)
    pub fn report_error(&self, error: &ScrapeError) {
        if !self.enabled {
            return;
        }
        let msg = ErrorProgressMessage {
            msg_type: "err",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            error_type: format!("{:?}", error.kind),
            message: error.message.clone(),
            path: error.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        };
        self.emit(&msg);
    }

    /// Report pass completion
    pub fn report_done(&self, result: &ScanResult) {
        if !self.enabled {
            return;
        }
        let msg = DoneMessage {
            msg_type: "done",
            seq: self.next_seq(),
            ts: self.current_timestamp(),
            total_files: result.total_files,
            scraped_files: result.scraped_count(),
            removed_nfos: result.removed_nfos,
            cancelled: result.cancelled,
            error_count: result.error_count(),
            ms: result.duration_ms,
        };
        self.emit(&msg);
    }
}
