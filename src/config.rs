use std::collections::HashMap;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::SchemaVariant;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database settings
    pub database: DatabaseConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Where exports come from
    pub source: SourceConfig,
    /// Note parsing
    pub notes: NotesConfig,
    /// Timestamp handling
    pub normalize: NormalizeConfig,
    /// Data-quality vocabulary and ranges
    pub quality: QualityConfig,
    /// Run reporting
    pub notify: NotifyConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Daily rolling log file, if any
    pub file_path: Option<String>,
    /// `json` or `text`
    pub format: String,
}

/// Export source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Folder the brewing app exports into
    pub directory: String,
    /// Export file name without the `_DDMMYYYY.csv` suffix
    pub file_stem: String,
    /// Field separator of the export
    pub csv_delimiter: char,
    /// Export layout, with or without a grinder column
    pub variant: SchemaVariant,
}

/// Note parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Character between labelled note fields
    pub delimiter: char,
}

/// Normalization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Offset applied to source timestamps before deriving `brew_date`
    pub utc_offset_minutes: i32,
}

/// Data-quality configuration. Empty lists turn their check off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityConfig {
    /// First word of a flavor or balance descriptor
    #[serde(default)]
    pub adverbs: Vec<String>,
    /// Second word of a flavor descriptor
    #[serde(default)]
    pub flavors: Vec<String>,
    /// Second word of a balance descriptor
    #[serde(default)]
    pub balance: Vec<String>,
    /// Keyed by grinder name, lower-cased with spaces and dashes as `_`
    #[serde(default)]
    pub grind_setting_ranges: HashMap<String, GrindRange>,
}

/// Inclusive range of valid settings for one grinder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrindRange {
    /// Lowest valid setting
    pub min: i64,
    /// Highest valid setting
    pub max: i64,
}

/// Run reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// File that receives one status line per run
    pub status_file: Option<String>,
    /// Name used in notification messages
    pub db_label: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/coffee_logs.db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            source: SourceConfig {
                directory: "./exports".to_string(),
                file_stem: "coffee_logs".to_string(),
                csv_delimiter: ';',
                variant: SchemaVariant::Classic,
            },
            notes: NotesConfig {
                delimiter: crate::notes::DEFAULT_DELIMITER,
            },
            normalize: NormalizeConfig { utc_offset_minutes: 0 },
            quality: QualityConfig::default(),
            notify: NotifyConfig {
                status_file: None,
                db_label: "coffee_logs.db".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("COFFEE_ETL").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.source.file_stem.trim().is_empty() {
            return Err(anyhow::anyhow!("source.file_stem cannot be empty"));
        }

        if self.source.csv_delimiter == self.notes.delimiter {
            return Err(anyhow::anyhow!(
                "source.csv_delimiter and notes.delimiter must differ (both are '{}')",
                self.notes.delimiter
            ));
        }

        // chrono only accepts offsets strictly inside +/- 24 hours
        if self.normalize.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(anyhow::anyhow!(
                "utc_offset_minutes out of range: {}",
                self.normalize.utc_offset_minutes
            ));
        }

        for (grinder, range) in &self.quality.grind_setting_ranges {
            if range.min > range.max {
                return Err(anyhow::anyhow!(
                    "Grind range for {} has min {} above max {}",
                    grinder,
                    range.min,
                    range.max
                ));
            }
        }

        Ok(())
    }

    /// Get database path from environment or config
    pub fn get_database_path(&self) -> String {
        std::env::var("COFFEE_ETL_DB").unwrap_or_else(|_| self.database.path.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}
