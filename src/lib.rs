//! Coffee Log ETL - Brewing Log Loader
//!
//! A Rust library that loads daily coffee brewing log exports into a local
//! SQLite database.
//!
//! # Features
//!
//! - Decode the brewing app's daily CSV export
//! - Parse labelled free-text notes (`Bean`, `Grinder`, `Grind`, `Flavor`, `Balance`)
//! - Key every brew by its local minute (`brew_date`)
//! - Snapshot each export into a staging table, then merge it idempotently
//!   into the durable log table, newest source row winning
//! - Data-quality warnings and a one-line status report per run

/// Configuration management
pub mod config;
/// Database connection and migrations
pub mod db;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Staging-to-durable merge
pub mod merge;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Row normalization
pub mod normalize;
/// Free-text note parsing
pub mod notes;
/// Run status reporting
pub mod notify;
/// End-to-end pipeline
pub mod pipeline;
/// Database schema definitions
pub mod schema;
/// Export sources and CSV decoding
pub mod source;
/// Staging table loader
pub mod staging;
/// Data-quality checks
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{EtlError, Result};
pub use merge::MergeUpserter;
pub use models::{CanonicalLogRecord, DataQualityWarning, ParsedNoteAttributes, RawExportRow, SchemaVariant};
pub use normalize::RecordNormalizer;
pub use notes::NoteParser;
pub use pipeline::{Pipeline, RunStatus, RunSummary};
pub use staging::StagingLoader;
