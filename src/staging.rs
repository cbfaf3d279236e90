//! Writes canonical records into the `raw_logs` staging table.

use std::collections::HashSet;

use rusqlite::{params, Connection, Transaction};
use tracing::info;

use crate::error::Result;
use crate::models::CanonicalLogRecord;
use crate::schema::raw_logs;

/// Loads a batch of records into staging, keyed by source timestamp.
pub struct StagingLoader<'a> {
    conn: &'a mut Connection,
}

impl<'a> StagingLoader<'a> {
    pub(crate) fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Replace the staging contents with `records` in one transaction.
    ///
    /// Returns the number of distinct rows now staged. Loading the same batch
    /// twice leaves the same contents.
    pub fn load(&mut self, records: &[CanonicalLogRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let cleared = tx.execute(&format!("DELETE FROM {}", raw_logs::TABLE), [])?;
        let written = insert_or_replace(&tx, records)?;
        tx.commit()?;

        info!(cleared, written, "Replaced staging snapshot");
        Ok(written)
    }

    /// Insert or replace `records` without clearing existing staging rows.
    pub fn load_delta(&mut self, records: &[CanonicalLogRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let written = insert_or_replace(&tx, records)?;
        tx.commit()?;

        info!(written, "Applied staging delta");
        Ok(written)
    }
}

fn insert_or_replace(tx: &Transaction<'_>, records: &[CanonicalLogRecord]) -> Result<usize> {
    let mut stmt = tx.prepare(&format!(
        "INSERT OR REPLACE INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        raw_logs::TABLE,
        raw_logs::TIMESTAMP,
        raw_logs::BREW_DATE,
        raw_logs::RECIPE,
        raw_logs::METHOD,
        raw_logs::COFFEE_GRAMS,
        raw_logs::SCORE,
        raw_logs::GRINDER,
        raw_logs::BEAN,
        raw_logs::GRIND,
        raw_logs::FLAVOR,
        raw_logs::BALANCE,
        raw_logs::NOTES,
    ))?;

    let mut keys = HashSet::new();
    for record in records {
        stmt.execute(params![
            record.source_timestamp,
            record.brew_date,
            record.recipe,
            record.method,
            record.coffee_grams,
            record.score,
            record.grinder,
            record.bean,
            record.grind,
            record.flavor,
            record.balance,
            record.notes,
        ])?;
        keys.insert(record.source_timestamp);
    }

    Ok(keys.len())
}
