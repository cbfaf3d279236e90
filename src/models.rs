//! Data models for brewing log handling and storage
//!
//! This module contains the records that flow through the pipeline: the raw
//! export row, the attributes parsed out of its notes, and the canonical record
//! written to the staging and durable tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which export layout the brewing app produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Older export without a grinder column
    #[default]
    Classic,
    /// Newer export with an explicit `Grinder` column
    Grinder,
}

impl SchemaVariant {
    /// Whether the export and the durable table have a grinder column.
    #[must_use]
    pub const fn has_grinder(self) -> bool {
        matches!(self, Self::Grinder)
    }

    /// Name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Grinder => "grinder",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "grinder" => Ok(Self::Grinder),
            other => Err(format!("unknown schema variant '{other}'")),
        }
    }
}

/// One row of the exported brewing log, exactly as it appeared in the file.
///
/// Every field is kept as text so that a missing or non-numeric timestamp can
/// be reported instead of failing the whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawExportRow {
    /// Seconds since the Unix epoch
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
    /// Recipe name
    #[serde(rename = "Recipe", default)]
    pub recipe: Option<String>,
    /// Brew method name
    #[serde(rename = "Method", default)]
    pub method: Option<String>,
    /// Coffee quantity, usually with a unit suffix such as `18 g`
    #[serde(rename = "Coffee", default)]
    pub coffee: Option<String>,
    /// Score out of 5
    #[serde(rename = "Score (out of 5)", alias = "Score", default)]
    pub score: Option<String>,
    /// Free-text notes in the `Label: value / Label: value` convention
    #[serde(rename = "Note", alias = "Notes", default)]
    pub notes: Option<String>,
    /// Grinder name (newer exports only)
    #[serde(rename = "Grinder", default)]
    pub grinder: Option<String>,
}

/// Attributes extracted from a notes string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedNoteAttributes {
    /// Bean name
    pub bean: Option<String>,
    /// Grinder name, written in the notes when the export has no grinder column
    pub grinder: Option<String>,
    /// Grind setting
    pub grind: Option<String>,
    /// Flavor description
    pub flavor: Option<String>,
    /// Balance description
    pub balance: Option<String>,
}

impl ParsedNoteAttributes {
    /// True when no label was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bean.is_none()
            && self.grinder.is_none()
            && self.grind.is_none()
            && self.flavor.is_none()
            && self.balance.is_none()
    }
}

/// The typed, keyed record stored in the staging and durable tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalLogRecord {
    /// Source timestamp in seconds since the epoch (staging key)
    pub source_timestamp: i64,
    /// `YYYY-MM-DD HH:MM` derived from the timestamp (durable key)
    pub brew_date: String,
    /// Recipe name
    pub recipe: Option<String>,
    /// Brew method name
    pub method: Option<String>,
    /// Coffee dose in grams
    pub coffee_grams: Option<f64>,
    /// Score from 1 to 5
    pub score: Option<i64>,
    /// Grinder name
    pub grinder: Option<String>,
    /// Bean name
    pub bean: Option<String>,
    /// Grind setting
    pub grind: Option<String>,
    /// Flavor description
    pub flavor: Option<String>,
    /// Balance description
    pub balance: Option<String>,
    /// Original notes text
    pub notes: Option<String>,
}

/// A non-fatal data-quality finding for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// Score present but outside 1..=5 or not a number
    ScoreRange {
        /// The key of the affected record
        brew_date: String,
        /// The raw score text
        value: String,
    },
    /// Score of 0, the app's marker for "not submitted"
    Unscored {
        /// The key of the affected record
        brew_date: String,
    },
    /// Coffee quantity could not be read as a number
    CoffeeQuantity {
        /// The key of the affected record
        brew_date: String,
        /// The raw quantity text
        value: String,
    },
    /// A field the analysis relies on is empty
    MissingValue {
        /// The key of the affected record
        brew_date: String,
        /// Column name
        field: &'static str,
    },
    /// A tasting note uses words outside the configured vocabulary
    Descriptor {
        /// The key of the affected record
        brew_date: String,
        /// Column name
        field: &'static str,
        /// The offending text
        value: String,
    },
    /// A grind setting is not an integer or is outside the grinder's range
    GrindSetting {
        /// The key of the affected record
        brew_date: String,
        /// Grinder name as exported
        grinder: String,
        /// The offending grind text
        value: String,
    },
    /// No grind range is configured for this grinder
    UnknownGrinder {
        /// The key of the affected record
        brew_date: String,
        /// Grinder name as exported
        grinder: String,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreRange { brew_date, value } => {
                write!(f, "{brew_date}: score '{value}' is not an integer from 1 to 5")
            }
            Self::Unscored { brew_date } => write!(f, "{brew_date}: brew score was not submitted"),
            Self::CoffeeQuantity { brew_date, value } => {
                write!(f, "{brew_date}: coffee quantity '{value}' is not a number")
            }
            Self::MissingValue { brew_date, field } => write!(f, "{brew_date}: column \"{field}\" is missing a value"),
            Self::Descriptor { brew_date, field, value } => {
                write!(f, "{brew_date}: column \"{field}\" contains unexpected text '{value}'")
            }
            Self::GrindSetting { brew_date, grinder, value } => {
                write!(f, "{brew_date}: grind setting '{value}' is invalid for grinder {grinder}")
            }
            Self::UnknownGrinder { brew_date, grinder } => {
                write!(f, "{brew_date}: grind settings range not set for grinder {grinder}")
            }
        }
    }
}
