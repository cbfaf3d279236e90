//! End-of-run status reporting.
//!
//! The webhook client that used to post these messages is outside this crate;
//! a [`Notifier`] receives the finished [`RunSummary`] and decides where the
//! status line goes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::pipeline::{RunStatus, RunSummary};

/// Format of the timestamp that prefixes every status line.
pub const STATUS_TIME_FORMAT: &str = "%Y-%m-%d %I:%M%p";

/// Receives the outcome of each run.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    /// Deliver the status of a finished run.
    fn notify(&self, summary: &RunSummary) -> Result<()>;
}

/// JSON body of a status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// `SUCCESS`, `PARTIAL` or `FAIL`
    pub status: &'static str,
    /// Human-readable summary
    pub message: String,
    /// Present on partial success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_rows: Option<usize>,
    /// Present on failure, on one line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Notification {
    /// Build the message for a run against `db_label`.
    #[must_use]
    pub fn from_summary(summary: &RunSummary, db_label: &str) -> Self {
        match &summary.status {
            RunStatus::Success => Self {
                status: summary.status.label(),
                message: format!("Successfully updated {db_label}!"),
                skipped_rows: None,
                error: None,
            },
            RunStatus::PartialSuccess { skipped } => Self {
                status: summary.status.label(),
                message: format!("Updated {db_label} with {} merged rows", summary.merged),
                skipped_rows: Some(*skipped),
                error: None,
            },
            RunStatus::Failure { error } => Self {
                status: summary.status.label(),
                message: format!("Failed to update {db_label}!"),
                skipped_rows: None,
                error: Some(error.replace('\n', " ")),
            },
        }
    }

    /// `"<time>": {"status":...}` as one line.
    pub fn render(&self, at: DateTime<FixedOffset>) -> Result<String> {
        Ok(format!("\"{}\": {}", at.format(STATUS_TIME_FORMAT), serde_json::to_string(self)?))
    }
}

/// Reports through the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    db_label: String,
}

impl TracingNotifier {
    /// Report runs against `db_label`.
    pub fn new(db_label: impl Into<String>) -> Self {
        Self {
            db_label: db_label.into(),
        }
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, summary: &RunSummary) -> Result<()> {
        let notification = Notification::from_summary(summary, &self.db_label);
        match summary.status {
            RunStatus::Success => info!(status = notification.status, "{}", notification.message),
            RunStatus::PartialSuccess { skipped } => {
                warn!(status = notification.status, skipped, "{}", notification.message);
            }
            RunStatus::Failure { .. } => error!(
                status = notification.status,
                error = notification.error.as_deref().unwrap_or_default(),
                "{}",
                notification.message
            ),
        }
        Ok(())
    }
}

/// Appends one timestamped status line per run to a file.
#[derive(Debug, Clone)]
pub struct StatusFileNotifier {
    path: PathBuf,
    db_label: String,
    offset: FixedOffset,
}

impl StatusFileNotifier {
    /// Append to `path`, stamping lines in `offset` local time.
    pub fn new(path: impl Into<PathBuf>, db_label: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            db_label: db_label.into(),
            offset,
        }
    }
}

impl Notifier for StatusFileNotifier {
    fn notify(&self, summary: &RunSummary) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let line = Notification::from_summary(summary, &self.db_label).render(summary.started_at.with_timezone(&self.offset))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Sends the same summary to several notifiers; the first error is returned
/// after all of them have run.
#[derive(Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    /// Add another notifier.
    #[must_use]
    pub fn with(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, summary: &RunSummary) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(summary) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Current time in the given offset, for status lines outside a run.
#[must_use]
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}
