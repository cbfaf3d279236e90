use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::Result;
use crate::merge::MergeUpserter;
use crate::models::{CanonicalLogRecord, SchemaVariant};
use crate::schema::{coffee_logs, raw_logs};
use crate::staging::StagingLoader;

/// Owner of the SQLite connection and of both pipeline tables.
pub struct Database {
    conn: Connection,
    variant: SchemaVariant,
}

impl Database {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: &str, variant: SchemaVariant) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        info!(path, %variant, "Opened brewing log database");
        Self::from_connection(conn, variant)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory(variant: SchemaVariant) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, variant)
    }

    fn from_connection(conn: Connection, variant: SchemaVariant) -> Result<Self> {
        Self::run_migrations(&conn, variant)?;
        Ok(Self { conn, variant })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection, variant: SchemaVariant) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-10-01-000000_create_tables/up.sql"))?;

        if variant.has_grinder() && !has_column(conn, coffee_logs::TABLE, coffee_logs::GRINDER)? {
            debug!("Adding grinder column to {}", coffee_logs::TABLE);
            conn.execute_batch(include_str!("../migrations/2026-10-01-000001_add_grinder_column/up.sql"))?;
        }

        Ok(())
    }

    /// Schema variant this database was opened for.
    #[must_use]
    pub const fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Loader that writes into the staging table.
    pub fn staging(&mut self) -> StagingLoader<'_> {
        StagingLoader::new(&mut self.conn)
    }

    /// Merger from the staging table into the durable table.
    pub fn merger(&mut self) -> MergeUpserter<'_> {
        MergeUpserter::new(&mut self.conn, self.variant)
    }

    /// Whether `table` currently has a column named `column`.
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(has_column(&self.conn, table, column)?)
    }

    /// Number of rows in the staging table
    pub fn staged_count(&self) -> Result<usize> {
        count_rows(&self.conn, raw_logs::TABLE)
    }

    /// Number of rows in the durable table
    pub fn durable_count(&self) -> Result<usize> {
        count_rows(&self.conn, coffee_logs::TABLE)
    }

    /// Staging rows, oldest first.
    pub fn staged_records(&self) -> Result<Vec<CanonicalLogRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} ASC",
            raw_logs::TABLE,
            raw_logs::TIMESTAMP
        ))?;
        let rows = stmt.query_map([], map_staging_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Durable rows, newest brew first.
    pub fn durable_records(&self, limit: Option<usize>) -> Result<Vec<CanonicalLogRecord>> {
        let mut query = format!(
            "SELECT * FROM {} ORDER BY {} DESC",
            coffee_logs::TABLE,
            coffee_logs::BREW_DATE
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], map_durable_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Look up one durable record by brew date.
    pub fn get_log(&self, brew_date: &str) -> Result<Option<CanonicalLogRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    coffee_logs::TABLE,
                    coffee_logs::BREW_DATE
                ),
                params![brew_date],
                map_durable_row,
            )
            .optional()?;

        Ok(record)
    }
}

/// `PRAGMA table_info` lookup.
pub(crate) fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>("name"))?;

    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

/// Map a staging row to a record
pub(crate) fn map_staging_row(row: &Row) -> rusqlite::Result<CanonicalLogRecord> {
    Ok(CanonicalLogRecord {
        source_timestamp: row.get(raw_logs::TIMESTAMP)?,
        brew_date: row.get(raw_logs::BREW_DATE)?,
        recipe: row.get(raw_logs::RECIPE)?,
        method: row.get(raw_logs::METHOD)?,
        coffee_grams: row.get(raw_logs::COFFEE_GRAMS)?,
        score: row.get(raw_logs::SCORE)?,
        grinder: row.get(raw_logs::GRINDER)?,
        bean: row.get(raw_logs::BEAN)?,
        grind: row.get(raw_logs::GRIND)?,
        flavor: row.get(raw_logs::FLAVOR)?,
        balance: row.get(raw_logs::BALANCE)?,
        notes: row.get(raw_logs::NOTES)?,
    })
}

/// Map a durable row to a record. The grinder column may not exist and the
/// durable table does not keep the raw notes.
fn map_durable_row(row: &Row) -> rusqlite::Result<CanonicalLogRecord> {
    Ok(CanonicalLogRecord {
        source_timestamp: row.get(coffee_logs::SOURCE_TIMESTAMP)?,
        brew_date: row.get(coffee_logs::BREW_DATE)?,
        recipe: row.get(coffee_logs::RECIPE)?,
        method: row.get(coffee_logs::METHOD)?,
        coffee_grams: row.get(coffee_logs::COFFEE_GRAMS)?,
        score: row.get(coffee_logs::SCORE)?,
        grinder: row.get::<_, Option<String>>(coffee_logs::GRINDER).ok().flatten(),
        bean: row.get(coffee_logs::BEAN)?,
        grind: row.get(coffee_logs::GRIND)?,
        flavor: row.get(coffee_logs::FLAVOR)?,
        balance: row.get(coffee_logs::BALANCE)?,
        notes: None,
    })
}
