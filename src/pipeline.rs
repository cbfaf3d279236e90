//! One pipeline run: Fetch, Parse/Normalize, Stage, Merge, Report.
//!
//! Row-level problems are counted and the run carries on. A fetch or storage
//! failure ends the run with a failure status. Either way the notifier hears
//! about it exactly once.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{EtlError, Result};
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{CanonicalLogRecord, DataQualityWarning};
use crate::normalize::RecordNormalizer;
use crate::notes::NoteParser;
use crate::notify::Notifier;
use crate::source::{read_export, ExportSource};
use crate::validation::QualityChecker;

/// Overall outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every row was merged
    Success,
    /// Merged, but some rows were skipped
    PartialSuccess {
        /// Rows that could not be normalized
        skipped: usize,
    },
    /// Nothing new was merged
    Failure {
        /// What stopped the run
        error: String,
    },
}

impl RunStatus {
    /// Short label used in notifications and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::PartialSuccess { .. } => "PARTIAL",
            Self::Failure { .. } => "FAIL",
        }
    }
}

/// Everything a caller needs to know about one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Where the export came from
    pub source: String,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// Data rows in the export
    pub rows_read: usize,
    /// Rows that could not be normalized
    pub skipped: usize,
    /// Rows written to staging
    pub staged: usize,
    /// Rows upserted into the durable table
    pub merged: usize,
    /// One line per skipped row
    pub anomalies: Vec<String>,
    /// Data-quality findings on merged rows
    pub warnings: Vec<DataQualityWarning>,
    /// Overall outcome
    pub status: RunStatus,
}

impl RunSummary {
    /// An empty summary that reports success until told otherwise.
    pub fn new(source: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            started_at,
            rows_read: 0,
            skipped: 0,
            staged: 0,
            merged: 0,
            anomalies: Vec::new(),
            warnings: Vec::new(),
            status: RunStatus::Success,
        }
    }
}

/// Normalized rows from one export, ready to stage.
#[derive(Debug, Default)]
pub struct PreparedBatch {
    /// Data rows in the export
    pub rows_read: usize,
    /// Rows that normalized cleanly
    pub records: Vec<CanonicalLogRecord>,
    /// Why each skipped row was rejected
    pub skipped: Vec<EtlError>,
    /// Normalizer and quality warnings
    pub warnings: Vec<DataQualityWarning>,
}

/// Wires the components together around one database.
pub struct Pipeline {
    db: Database,
    normalizer: RecordNormalizer,
    checker: QualityChecker,
    csv_delimiter: char,
}

impl Pipeline {
    /// Assemble a pipeline from ready-made parts.
    pub fn new(db: Database, normalizer: RecordNormalizer, checker: QualityChecker, csv_delimiter: char) -> Self {
        Self {
            db,
            normalizer,
            checker,
            csv_delimiter,
        }
    }

    /// Build every component from configuration and open the database.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let variant = config.source.variant;
        let parser = NoteParser::new(config.notes.delimiter)?;
        let normalizer = RecordNormalizer::new(parser, variant, config.normalize.utc_offset_minutes)?;
        let checker = QualityChecker::new(&config.quality)?;
        let db = Database::open(&config.get_database_path(), variant)?;

        Ok(Self::new(db, normalizer, checker, config.source.csv_delimiter))
    }

    /// The database this pipeline writes to.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    /// Decode and normalize an export. Only a broken export as a whole fails.
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreparedBatch> {
        let timer = OperationTimer::new("normalize");
        let export = read_export(bytes, self.csv_delimiter)?;

        let mut batch = PreparedBatch {
            rows_read: export.rows.len() + export.malformed.len(),
            skipped: export.malformed,
            ..PreparedBatch::default()
        };

        for (row_number, row) in &export.rows {
            match self.normalizer.normalize(*row_number, row) {
                Ok(normalized) => {
                    batch.warnings.extend(normalized.warnings);
                    batch.warnings.extend(self.checker.check(&normalized.record));
                    batch.records.push(normalized.record);
                }
                Err(e) if e.is_row_level() => batch.skipped.push(e),
                Err(e) => return Err(e),
            }
        }

        timer.finish();
        Ok(batch)
    }

    /// Replace the staging snapshot with the batch.
    pub fn stage(&mut self, batch: &PreparedBatch) -> Result<usize> {
        let timer = OperationTimer::new("stage");
        let staged = self.db.staging().load(&batch.records)?;
        timer.finish();
        metrics::record_rows_staged(staged);
        Ok(staged)
    }

    /// Merge whatever is staged into the durable table.
    pub fn merge(&mut self) -> Result<usize> {
        let timer = OperationTimer::new("merge");
        let merged = self.db.merger().merge()?;
        timer.finish();
        metrics::record_rows_merged(merged);
        if let Ok(total) = self.db.durable_count() {
            metrics::set_durable_rows(total);
        }
        Ok(merged)
    }

    /// Run the whole pipeline for `date` and report the outcome.
    pub fn run(&mut self, source: &dyn ExportSource, date: NaiveDate, notifier: &dyn Notifier) -> RunSummary {
        let mut summary = RunSummary::new(source.describe(), Utc::now());
        info!(source = %summary.source, %date, "Starting pipeline run");

        match self.execute(source, date, &mut summary) {
            Ok(()) if summary.skipped > 0 => {
                summary.status = RunStatus::PartialSuccess {
                    skipped: summary.skipped,
                };
            }
            Ok(()) => summary.status = RunStatus::Success,
            Err(e) => {
                error!("Pipeline failed with error: {e}");
                summary.status = RunStatus::Failure { error: e.to_string() };
            }
        }

        metrics::record_run(summary.status.label());
        if let Err(e) = notifier.notify(&summary) {
            error!("Failed to send run notification: {e}");
        }

        info!(
            status = summary.status.label(),
            rows_read = summary.rows_read,
            skipped = summary.skipped,
            staged = summary.staged,
            merged = summary.merged,
            warnings = summary.warnings.len(),
            "Pipeline finished running"
        );
        summary
    }

    /// Stage and merge an export that is already in memory.
    pub fn run_bytes(&mut self, bytes: &[u8], summary: &mut RunSummary) -> Result<()> {
        let batch = self.prepare(bytes)?;

        summary.rows_read = batch.rows_read;
        summary.skipped = batch.skipped.len();
        metrics::record_rows_read(batch.rows_read);
        metrics::record_rows_skipped(batch.skipped.len());
        metrics::record_quality_warnings(batch.warnings.len());

        for anomaly in &batch.skipped {
            warn!("Skipping row: {anomaly}");
            summary.anomalies.push(anomaly.to_string());
        }
        for warning in &batch.warnings {
            warn!("Data quality: {warning}");
        }
        summary.warnings.clone_from(&batch.warnings);

        summary.staged = self.stage(&batch)?;
        summary.merged = self.merge()?;
        Ok(())
    }

    fn execute(&mut self, source: &dyn ExportSource, date: NaiveDate, summary: &mut RunSummary) -> Result<()> {
        let bytes = source.fetch(date)?;
        self.run_bytes(&bytes, summary)
    }
}
