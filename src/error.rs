//! Error types for the coffee-log-etl library.
//!
//! Per-row problems (`MalformedRow`) are collected by the pipeline and reported
//! in the run summary. Everything else aborts the current run.

use thiserror::Error;

/// Errors that can occur while loading brewing logs.
#[derive(Error, Debug)]
pub enum EtlError {
    /// No export was available, or it was empty
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A row is missing a required key field such as the timestamp
    #[error("Malformed row {row}: {reason}")]
    MalformedRow {
        /// 1-based data row number within the export
        row: usize,
        /// What was wrong with the row
        reason: String,
    },

    /// Storage failure while merging staging into the durable table
    #[error("Merge failed: {0}")]
    Merge(#[source] rusqlite::Error),

    /// Database-related errors outside the merge transaction
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Export decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with EtlError
pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    /// Build a malformed-row error.
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            row,
            reason: reason.into(),
        }
    }

    /// True for errors that only affect a single row.
    #[must_use]
    pub const fn is_row_level(&self) -> bool {
        matches!(self, Self::MalformedRow { .. })
    }
}

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
