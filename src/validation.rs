use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::config::{GrindRange, QualityConfig};
use crate::error::{EtlError, Result};
use crate::models::{CanonicalLogRecord, DataQualityWarning};

/// Balance notes that are allowed to be a single word.
const BALANCED: &str = "Balanced";

/// Data-quality checks on canonical records.
///
/// Every finding is a warning. Checks backed by an empty vocabulary or range
/// table are skipped.
#[derive(Debug, Clone)]
pub struct QualityChecker {
    adverbs: HashSet<String>,
    flavors: HashSet<String>,
    balance: HashSet<String>,
    grind_ranges: HashMap<String, GrindRange>,
    grinder_key_regex: Regex,
}

impl QualityChecker {
    /// Build a checker from the configured vocabulary and ranges.
    pub fn new(config: &QualityConfig) -> Result<Self> {
        let grinder_key_regex = Regex::new(r"\s+|-")
            .map_err(|e| EtlError::Other(format!("Failed to compile grinder key regex: {e}")))?;

        Ok(Self {
            adverbs: lowercase_set(&config.adverbs),
            flavors: lowercase_set(&config.flavors),
            balance: lowercase_set(&config.balance),
            grind_ranges: config.grind_setting_ranges.clone(),
            grinder_key_regex,
        })
    }

    /// Run every check against one record.
    #[must_use]
    pub fn check(&self, record: &CanonicalLogRecord) -> Vec<DataQualityWarning> {
        let mut warnings = Vec::new();

        for (field, value) in [
            ("bean", &record.bean),
            ("grind", &record.grind),
            ("flavor", &record.flavor),
            ("balance", &record.balance),
        ] {
            if value.is_none() {
                warnings.push(DataQualityWarning::MissingValue {
                    brew_date: record.brew_date.clone(),
                    field,
                });
            }
        }

        if let Some(flavor) = &record.flavor {
            if !self.is_valid_descriptor(flavor, &self.flavors) {
                warnings.push(DataQualityWarning::Descriptor {
                    brew_date: record.brew_date.clone(),
                    field: "flavor",
                    value: flavor.clone(),
                });
            }
        }

        if let Some(balance) = record.balance.as_ref().filter(|b| b.as_str() != BALANCED) {
            if !self.is_valid_descriptor(balance, &self.balance) {
                warnings.push(DataQualityWarning::Descriptor {
                    brew_date: record.brew_date.clone(),
                    field: "balance",
                    value: balance.clone(),
                });
            }
        }

        if let (Some(grinder), Some(grind)) = (&record.grinder, &record.grind) {
            warnings.extend(self.check_grind(&record.brew_date, grinder, grind));
        }

        warnings
    }

    /// Config key for a grinder name: `Comandante C40` -> `comandante_c40`.
    #[must_use]
    pub fn grinder_key(&self, grinder: &str) -> String {
        self.grinder_key_regex
            .replace_all(&grinder.trim().to_lowercase(), "_")
            .into_owned()
    }

    /// A descriptor is exactly "<adverb> <adjective>" from the configured lists.
    fn is_valid_descriptor(&self, text: &str, adjectives: &HashSet<String>) -> bool {
        if self.adverbs.is_empty() || adjectives.is_empty() {
            return true;
        }

        let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        match words.as_slice() {
            [adverb, adjective] => self.adverbs.contains(adverb) && adjectives.contains(adjective),
            _ => false,
        }
    }

    fn check_grind(&self, brew_date: &str, grinder: &str, grind: &str) -> Option<DataQualityWarning> {
        if self.grind_ranges.is_empty() {
            return None;
        }

        let Some(range) = self.grind_ranges.get(&self.grinder_key(grinder)) else {
            return Some(DataQualityWarning::UnknownGrinder {
                brew_date: brew_date.to_string(),
                grinder: grinder.to_string(),
            });
        };

        match grind.trim().parse::<i64>() {
            Ok(setting) if (range.min..=range.max).contains(&setting) => None,
            _ => Some(DataQualityWarning::GrindSetting {
                brew_date: brew_date.to_string(),
                grinder: grinder.to_string(),
                value: grind.to_string(),
            }),
        }
    }
}

fn lowercase_set(words: &[String]) -> HashSet<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
