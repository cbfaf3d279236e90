//! Run metrics.
//!
//! Nothing installs a recorder here, so these calls are no-ops unless the
//! embedding process sets one up.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Export rows read, malformed ones included
pub const ROWS_READ_TOTAL: &str = "coffee_etl_rows_read_total";
/// Rows skipped as malformed
pub const ROWS_SKIPPED_TOTAL: &str = "coffee_etl_rows_skipped_total";
/// Rows written to staging
pub const ROWS_STAGED_TOTAL: &str = "coffee_etl_rows_staged_total";
/// Rows upserted into the durable table
pub const ROWS_MERGED_TOTAL: &str = "coffee_etl_rows_merged_total";
/// Data-quality warnings raised
pub const QUALITY_WARNINGS_TOTAL: &str = "coffee_etl_quality_warnings_total";
/// Finished runs, labelled by status
pub const RUNS_TOTAL: &str = "coffee_etl_runs_total";
/// Seconds spent per stage
pub const STAGE_DURATION: &str = "coffee_etl_stage_duration_seconds";
/// Rows in the durable table after the last merge
pub const DURABLE_ROWS: &str = "coffee_etl_durable_rows";

/// Count rows read from an export.
pub fn record_rows_read(count: usize) {
    counter!(ROWS_READ_TOTAL).increment(count as u64);
}

/// Count skipped rows.
pub fn record_rows_skipped(count: usize) {
    counter!(ROWS_SKIPPED_TOTAL).increment(count as u64);
}

/// Count staged rows.
pub fn record_rows_staged(count: usize) {
    counter!(ROWS_STAGED_TOTAL).increment(count as u64);
}

/// Count merged rows.
pub fn record_rows_merged(count: usize) {
    counter!(ROWS_MERGED_TOTAL).increment(count as u64);
}

/// Count data-quality warnings.
pub fn record_quality_warnings(count: usize) {
    counter!(QUALITY_WARNINGS_TOTAL).increment(count as u64);
}

/// Count a finished run under its status label.
pub fn record_run(status: &'static str) {
    counter!(RUNS_TOTAL, "status" => status).increment(1);
}

/// Record how long one stage took.
pub fn record_stage_duration(stage: &str, duration: Duration) {
    histogram!(STAGE_DURATION, "stage" => stage.to_string()).record(duration.as_secs_f64());
}

/// Set the durable row gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_durable_rows(count: usize) {
    gauge!(DURABLE_ROWS).set(count as f64);
}
