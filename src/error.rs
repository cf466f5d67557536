//! Error types for the library scraper

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that can occur during a scrape pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScrapeErrorKind {
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// I/O error during file operations
    IoError,
    /// Sidecar metadata file could not be read or parsed
    NfoError,
    /// Transfer history store operation failed
    DatabaseError,
    /// Configuration record could not be loaded or saved
    ConfigError,
    /// Invalid path entry
    InvalidPath,
}

/// Represents an error that occurred during scraping
#[derive(Debug, Error, Serialize)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct ScrapeError {
    /// The kind of error
    pub kind: ScrapeErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// Create a new scrape error
    pub fn new(kind: ScrapeErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(path: PathBuf) -> Self {
        Self::new(
            ScrapeErrorKind::NotFound,
            Some(path.clone()),
            format!("Not found: {:?}", path),
        )
    }

    /// Create an I/O error
    pub fn io_error(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::IoError, path, message)
    }

    /// Create a sidecar parse error; the file is attached later with [`ScrapeError::at`]
    pub fn nfo_error(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::NfoError, None, message)
    }

    /// Create an invalid path error
    pub fn invalid_path(entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self::new(
            ScrapeErrorKind::InvalidPath,
            Some(PathBuf::from(&entry)),
            format!("Invalid path entry: {:?}", entry),
        )
    }

    /// Create a database error
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::DatabaseError, None, message)
    }

    /// Create a configuration error
    pub fn config_error(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorKind::ConfigError, path, message)
    }

    /// Attach a path to an error that was raised without one
    pub fn at(mut self, path: impl Into<PathBuf>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.into());
        }
        self
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ScrapeErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ScrapeErrorKind::NotFound,
            _ => ScrapeErrorKind::IoError,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<rusqlite::Error> for ScrapeError {
    fn from(err: rusqlite::Error) -> Self {
        Self::database_error(err.to_string())
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_error(None, err.to_string())
    }
}
