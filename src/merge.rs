//! Merges the staging snapshot into the durable `coffee_logs` table.
//!
//! Staging rows are read newest first and the first row seen for each
//! `brew_date` is the one written, so when two exports collapse onto the same
//! brew date the later timestamp wins no matter how the rows were staged. The
//! whole merge is one transaction.

use std::collections::HashSet;

use rusqlite::types::ToSql;
use rusqlite::{Connection, Transaction};
use tracing::{info, warn};

use crate::db::{has_column, map_staging_row};
use crate::error::{EtlError, Result};
use crate::models::{CanonicalLogRecord, SchemaVariant};
use crate::schema::{coffee_logs, raw_logs};

/// Applies insert-or-replace by `brew_date` from staging to the durable table.
pub struct MergeUpserter<'a> {
    conn: &'a mut Connection,
    variant: SchemaVariant,
}

impl<'a> MergeUpserter<'a> {
    pub(crate) fn new(conn: &'a mut Connection, variant: SchemaVariant) -> Self {
        Self { conn, variant }
    }

    /// Merge every staged row and return how many durable rows were written.
    ///
    /// Staging is left as is, so the merge can be re-run after a crash.
    pub fn merge(&mut self) -> Result<usize> {
        let variant = self.variant;
        let tx = self.conn.transaction().map_err(EtlError::Merge)?;

        let merged = merge_in(&tx, variant).map_err(EtlError::Merge)?;
        tx.commit().map_err(EtlError::Merge)?;

        info!(merged, %variant, "Merged staging into {}", coffee_logs::TABLE);
        Ok(merged)
    }
}

fn merge_in(tx: &Transaction<'_>, variant: SchemaVariant) -> rusqlite::Result<usize> {
    let write_grinder = has_column(tx, coffee_logs::TABLE, coffee_logs::GRINDER)?;
    if variant.has_grinder() && !write_grinder {
        warn!(
            "{} has no {} column; grinder values will not be merged",
            coffee_logs::TABLE,
            coffee_logs::GRINDER
        );
    }

    let staged = newest_first(tx)?;
    let mut upsert = tx.prepare(&upsert_sql(write_grinder))?;
    let mut seen = HashSet::new();

    for record in &staged {
        if !seen.insert(record.brew_date.as_str()) {
            warn!(
                brew_date = %record.brew_date,
                timestamp = record.source_timestamp,
                "Skipping older staging row that maps to an already merged brew date"
            );
            continue;
        }

        let grinder = if variant.has_grinder() {
            record.grinder.as_deref()
        } else {
            None
        };

        let mut values: Vec<&dyn ToSql> = vec![
            &record.brew_date,
            &record.source_timestamp,
            &record.recipe,
            &record.method,
            &record.coffee_grams,
            &record.score,
            &record.bean,
            &record.grind,
            &record.flavor,
            &record.balance,
        ];
        if write_grinder {
            values.push(&grinder);
        }

        upsert.execute(values.as_slice())?;
    }

    Ok(seen.len())
}

fn newest_first(tx: &Transaction<'_>) -> rusqlite::Result<Vec<CanonicalLogRecord>> {
    let mut stmt = tx.prepare(&format!(
        "SELECT * FROM {} ORDER BY {} DESC",
        raw_logs::TABLE,
        raw_logs::TIMESTAMP
    ))?;
    let rows = stmt.query_map([], map_staging_row)?;
    rows.collect()
}

fn upsert_sql(write_grinder: bool) -> String {
    let mut columns = vec![
        coffee_logs::BREW_DATE,
        coffee_logs::SOURCE_TIMESTAMP,
        coffee_logs::RECIPE,
        coffee_logs::METHOD,
        coffee_logs::COFFEE_GRAMS,
        coffee_logs::SCORE,
        coffee_logs::BEAN,
        coffee_logs::GRIND,
        coffee_logs::FLAVOR,
        coffee_logs::BALANCE,
    ];
    if write_grinder {
        columns.push(coffee_logs::GRINDER);
    }

    let placeholders = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>();
    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        coffee_logs::TABLE,
        columns.join(", "),
        placeholders.join(", ")
    )
}
