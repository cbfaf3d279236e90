//! Database schema definitions
//!
//! Table and column names used with rusqlite. The tables themselves are created
//! by the SQL files under `migrations/`.

/// Staging table: the most recent export batch, keyed by source timestamp
pub mod raw_logs {
    /// Table name
    pub const TABLE: &str = "raw_logs";
    /// Primary key column (seconds since epoch)
    pub const TIMESTAMP: &str = "timestamp";
    /// Derived brew date column
    pub const BREW_DATE: &str = "brew_date";
    /// Recipe name column
    pub const RECIPE: &str = "recipe";
    /// Brew method column
    pub const METHOD: &str = "method";
    /// Coffee dose column
    pub const COFFEE_GRAMS: &str = "coffee_grams";
    /// Score column
    pub const SCORE: &str = "score";
    /// Grinder column
    pub const GRINDER: &str = "grinder";
    /// Bean column
    pub const BEAN: &str = "bean";
    /// Grind setting column
    pub const GRIND: &str = "grind";
    /// Flavor column
    pub const FLAVOR: &str = "flavor";
    /// Balance column
    pub const BALANCE: &str = "balance";
    /// Raw notes column
    pub const NOTES: &str = "notes";
}

/// Durable table: every merged record, keyed by brew date
pub mod coffee_logs {
    /// Table name
    pub const TABLE: &str = "coffee_logs";
    /// Primary key column
    pub const BREW_DATE: &str = "brew_date";
    /// Timestamp of the staging row the record came from
    pub const SOURCE_TIMESTAMP: &str = "source_timestamp";
    /// Recipe name column
    pub const RECIPE: &str = "recipe";
    /// Brew method column
    pub const METHOD: &str = "method";
    /// Coffee dose column
    pub const COFFEE_GRAMS: &str = "coffee_grams";
    /// Score column
    pub const SCORE: &str = "score";
    /// Grinder column, only present for the grinder schema variant
    pub const GRINDER: &str = "grinder";
    /// Bean column
    pub const BEAN: &str = "bean";
    /// Grind setting column
    pub const GRIND: &str = "grind";
    /// Flavor column
    pub const FLAVOR: &str = "flavor";
    /// Balance column
    pub const BALANCE: &str = "balance";
}
