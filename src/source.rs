//! Where exports come from and how their bytes become rows.
//!
//! Fetching is a collaborator concern: the pipeline only needs a complete byte
//! buffer or a `Fetch` error. The brewing app drops one export per day into a
//! synced folder, named `<stem>_<DDMMYYYY>.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::RawExportRow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Supplies the raw export for a given day.
#[cfg_attr(test, mockall::automock)]
pub trait ExportSource {
    /// Human-readable location, used in logs and notifications.
    fn describe(&self) -> String;

    /// The complete export for `date`, or `EtlError::Fetch` when none exists.
    fn fetch(&self, date: NaiveDate) -> Result<Vec<u8>>;
}

/// Reads dated exports from a local (synced) folder.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: PathBuf,
    file_stem: String,
}

impl DirectorySource {
    /// Look for `<file_stem>_DDMMYYYY.csv` under `directory`.
    pub fn new(directory: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_stem: file_stem.into(),
        }
    }

    /// `coffee_logs_14112023.csv` for 2023-11-14.
    #[must_use]
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.csv", self.file_stem, date.format("%d%m%Y"))
    }

    /// Full path of the export for `date`.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(self.file_name(date))
    }
}

impl ExportSource for DirectorySource {
    fn describe(&self) -> String {
        self.directory.display().to_string()
    }

    fn fetch(&self, date: NaiveDate) -> Result<Vec<u8>> {
        let path = self.path_for(date);
        debug!(path = %path.display(), "Looking for export");
        read_export_file(&path)
    }
}

/// A single export file given explicitly, whatever the date.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Always read `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExportSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, _date: NaiveDate) -> Result<Vec<u8>> {
        read_export_file(&self.path)
    }
}

fn read_export_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(EtlError::Fetch(format!("no export found at {}", path.display())));
    }

    let bytes = fs::read(path)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(EtlError::Fetch(format!("export {} is empty", path.display())));
    }

    info!(path = %path.display(), bytes = bytes.len(), "Fetched export");
    Ok(bytes)
}

/// Rows decoded from one export.
#[derive(Debug, Default)]
pub struct ExportRows {
    /// Decoded rows with their 1-based data row number
    pub rows: Vec<(usize, RawExportRow)>,
    /// Rows the CSV reader could not decode
    pub malformed: Vec<EtlError>,
}

/// Decode export bytes. A missing `Timestamp` header fails the whole export;
/// a single undecodable row is only recorded as malformed.
pub fn read_export(bytes: &[u8], delimiter: char) -> Result<ExportRows> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| EtlError::InvalidConfig(format!("CSV delimiter '{delimiter}' must be ASCII")))?;

    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == "Timestamp") {
        return Err(EtlError::Fetch(format!(
            "export has no Timestamp column (found: {})",
            headers.iter().collect::<Vec<_>>().join(", ")
        )));
    }

    let mut out = ExportRows::default();
    for (index, result) in reader.deserialize::<RawExportRow>().enumerate() {
        let row_number = index + 1;
        match result {
            Ok(row) => out.rows.push((row_number, row)),
            Err(e) => out.malformed.push(EtlError::malformed(row_number, e.to_string())),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_uses_day_month_year() {
        let source = DirectorySource::new("/exports", "coffee_logs");
        let date = NaiveDate::from_ymd_opt(2023, 11, 4).expect("valid date");
        assert_eq!(source.file_name(date), "coffee_logs_04112023.csv");
    }

    #[test]
    fn test_read_export_semicolon() {
        let data = "Timestamp;Recipe;Method;Coffee;Score (out of 5);Note\n\
                    1700000000;V60;Pour over;18 g;4;Bean: Kenya / Grind: 20\n";
        let export = read_export(data.as_bytes(), ';').expect("read failed");

        assert_eq!(export.rows.len(), 1);
        let (row_number, row) = &export.rows[0];
        assert_eq!(*row_number, 1);
        assert_eq!(row.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(row.score.as_deref(), Some("4"));
        assert_eq!(row.notes.as_deref(), Some("Bean: Kenya / Grind: 20"));
        assert!(row.grinder.is_none());
    }

    #[test]
    fn test_read_export_with_bom_and_grinder() {
        let data = "\u{feff}Timestamp;Recipe;Grinder;Score;Notes\n1700000000;V60;C40;5;Flavor sweet\n";
        let export = read_export(data.as_bytes(), ';').expect("read failed");
        let row = &export.rows[0].1;

        assert_eq!(row.grinder.as_deref(), Some("C40"));
        assert_eq!(row.score.as_deref(), Some("5"));
        assert_eq!(row.notes.as_deref(), Some("Flavor sweet"));
    }

    #[test]
    fn test_read_export_without_timestamp_column() {
        let data = "Recipe,Score\nV60,4\n";
        let err = read_export(data.as_bytes(), ';').expect_err("should fail");
        assert!(matches!(err, EtlError::Fetch(_)));
    }

    #[test]
    fn test_empty_fields_are_none() {
        let data = "Timestamp;Recipe;Score (out of 5);Note\n;V60;;\n";
        let export = read_export(data.as_bytes(), ';').expect("read failed");
        let row = &export.rows[0].1;
        assert!(row.timestamp.is_none());
        assert!(row.score.is_none());
    }
}
