//! Turns raw export rows into canonical, keyed records.

use chrono::{DateTime, FixedOffset};

use crate::error::{EtlError, Result};
use crate::models::{CanonicalLogRecord, DataQualityWarning, RawExportRow, SchemaVariant};
use crate::notes::NoteParser;

/// Format of the `brew_date` key.
pub const BREW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A normalized record plus the data-quality findings raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The canonical record
    pub record: CanonicalLogRecord,
    /// Non-fatal findings for the caller to log
    pub warnings: Vec<DataQualityWarning>,
}

/// Combines a row's flat fields with its parsed notes.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    parser: NoteParser,
    variant: SchemaVariant,
    offset: FixedOffset,
}

impl RecordNormalizer {
    /// `utc_offset_minutes` shifts timestamps before the brew date is derived.
    pub fn new(parser: NoteParser, variant: SchemaVariant, utc_offset_minutes: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or_else(|| EtlError::InvalidConfig(format!("utc_offset_minutes out of range: {utc_offset_minutes}")))?;

        Ok(Self {
            parser,
            variant,
            offset,
        })
    }

    /// Schema variant rows are normalized for.
    #[must_use]
    pub const fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Normalize one export row. `row_number` is only used in error messages.
    ///
    /// Fails when the timestamp is missing or not a number, since it is the
    /// record's key. Every other problem becomes a warning.
    pub fn normalize(&self, row_number: usize, row: &RawExportRow) -> Result<Normalized> {
        let timestamp = parse_timestamp(row.timestamp.as_deref()).map_err(|reason| EtlError::malformed(row_number, reason))?;
        let brew_date = self.brew_date(timestamp).ok_or_else(|| {
            EtlError::malformed(row_number, format!("timestamp {timestamp} is outside the supported date range"))
        })?;

        let mut warnings = Vec::new();

        let score = match clean_text(row.score.as_deref()) {
            None => {
                warnings.push(DataQualityWarning::MissingValue {
                    brew_date: brew_date.clone(),
                    field: "score",
                });
                None
            }
            Some(raw) => match parse_score(&raw) {
                ScoreValue::Valid(score) => Some(score),
                ScoreValue::Unscored => {
                    warnings.push(DataQualityWarning::Unscored {
                        brew_date: brew_date.clone(),
                    });
                    None
                }
                ScoreValue::Invalid => {
                    warnings.push(DataQualityWarning::ScoreRange {
                        brew_date: brew_date.clone(),
                        value: raw,
                    });
                    None
                }
            },
        };

        let coffee_grams = clean_text(row.coffee.as_deref()).and_then(|raw| {
            let grams = parse_grams(&raw);
            if grams.is_none() {
                warnings.push(DataQualityWarning::CoffeeQuantity {
                    brew_date: brew_date.clone(),
                    value: raw,
                });
            }
            grams
        });

        let notes = clean_text(row.notes.as_deref());
        let attrs = notes.as_deref().map(|text| self.parser.parse(text)).unwrap_or_default();

        // Older exports name the grinder inside the notes instead of a column
        let grinder = if self.variant.has_grinder() {
            clean_text(row.grinder.as_deref())
        } else {
            None
        }
        .or(attrs.grinder);

        Ok(Normalized {
            record: CanonicalLogRecord {
                source_timestamp: timestamp,
                brew_date,
                recipe: clean_text(row.recipe.as_deref()),
                method: clean_text(row.method.as_deref()),
                coffee_grams,
                score,
                grinder,
                bean: attrs.bean,
                grind: attrs.grind,
                flavor: attrs.flavor,
                balance: attrs.balance,
                notes,
            },
            warnings,
        })
    }

    /// `YYYY-MM-DD HH:MM` in the configured offset.
    #[must_use]
    pub fn brew_date(&self, timestamp: i64) -> Option<String> {
        DateTime::from_timestamp(timestamp, 0)
            .map(|utc| utc.with_timezone(&self.offset).format(BREW_DATE_FORMAT).to_string())
    }
}

enum ScoreValue {
    Valid(i64),
    Unscored,
    Invalid,
}

/// Whole seconds; decimal exports are truncated.
fn parse_timestamp(raw: Option<&str>) -> std::result::Result<i64, String> {
    let text = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or("missing timestamp")?;

    if let Ok(seconds) = text.parse::<i64>() {
        return Ok(seconds);
    }

    match text.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(seconds) if seconds.is_finite() && seconds.abs() < 1e15 => Ok(seconds.trunc() as i64),
        _ => Err(format!("timestamp '{text}' is not numeric")),
    }
}

fn parse_score(raw: &str) -> ScoreValue {
    let value = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.fract() == 0.0 && v.abs() < 1e6).map(|v| v as i64));

    match value {
        Some(0) => ScoreValue::Unscored,
        Some(score @ 1..=5) => ScoreValue::Valid(score),
        _ => ScoreValue::Invalid,
    }
}

/// Strip a trailing unit such as ` g` or `g` and read the number.
fn parse_grams(raw: &str) -> Option<f64> {
    let number = raw
        .trim_end_matches(|c: char| c.is_alphabetic())
        .trim()
        .replace(',', ".");
    number.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Trimmed text, with empty strings treated as absent.
fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string)
}
