//! End-to-end runs against a database file on disk

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use std::collections::HashMap;

use coffee_log_etl::config::{GrindRange, QualityConfig};
use coffee_log_etl::notes::DEFAULT_DELIMITER;
use coffee_log_etl::notify::{StatusFileNotifier, TracingNotifier};
use coffee_log_etl::source::{DirectorySource, FileSource};
use coffee_log_etl::validation::QualityChecker;
use coffee_log_etl::{Database, DataQualityWarning, NoteParser, Pipeline, RecordNormalizer, RunStatus, SchemaVariant};
use tempfile::TempDir;

const HEADER: &str = "Timestamp;Recipe;Method;Coffee;Score (out of 5);Note";

fn pipeline(dir: &Path, variant: SchemaVariant) -> Pipeline {
    pipeline_with_quality(dir, variant, &QualityConfig::default())
}

fn pipeline_with_quality(dir: &Path, variant: SchemaVariant, quality: &QualityConfig) -> Pipeline {
    let db_path = dir.join("coffee.db");
    let db = Database::open(&db_path.to_string_lossy(), variant).expect("Failed to open database");
    let parser = NoteParser::new(DEFAULT_DELIMITER).expect("Failed to create parser");
    let normalizer = RecordNormalizer::new(parser, variant, 0).expect("Failed to create normalizer");
    let checker = QualityChecker::new(quality).expect("Failed to create checker");
    Pipeline::new(db, normalizer, checker, ';')
}

fn write_export(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join("coffee_logs_15112023.csv");
    let mut contents = String::from(HEADER);
    for row in rows {
        contents.push('\n');
        contents.push_str(row);
    }
    contents.push('\n');
    fs::write(&path, contents).expect("Failed to write export");
    path
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 11, 15).expect("valid date")
}

fn durable_dump(pipeline: &Pipeline) -> String {
    let records = pipeline.database().durable_records(None).expect("Failed to read durable rows");
    serde_json::to_string(&records).expect("Failed to serialize rows")
}

#[test]
fn test_end_to_end_v60_row() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let export = write_export(
        dir.path(),
        &["1700000000;V60;Pour over;18 g;4;Bean: Ethiopia / Grind: 22 / Flavor floral, light / Balance: clean, bright"],
    );

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    let summary = pipeline.run(&FileSource::new(&export), date(), &TracingNotifier::new("coffee.db"));
    assert_eq!(summary.status, RunStatus::Success);
    assert_eq!(summary.merged, 1);

    let record = pipeline
        .database()
        .get_log("2023-11-14 22:13")
        .expect("Failed to query")
        .expect("Record should exist");
    assert_eq!(record.source_timestamp, 1_700_000_000);
    assert_eq!(record.recipe.as_deref(), Some("V60"));
    assert_eq!(record.coffee_grams, Some(18.0));
    assert_eq!(record.score, Some(4));
    assert_eq!(record.bean.as_deref(), Some("Ethiopia"));
    assert_eq!(record.grind.as_deref(), Some("22"));
    assert_eq!(record.flavor.as_deref(), Some("floral, light"));
    assert_eq!(record.balance.as_deref(), Some("clean, bright"));
}

#[test]
fn test_rerun_leaves_durable_table_unchanged() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let export = write_export(
        dir.path(),
        &[
            "1700000000;V60;Pour over;18 g;4;Bean: Ethiopia / Grind: 22",
            "1700086400;Kalita;Pour over;20 g;5;Bean: Kenya / Flavor very sweet",
            "1700172800;Aeropress;Immersion;15 g;3;",
        ],
    );
    let source = FileSource::new(&export);
    let notifier = TracingNotifier::new("coffee.db");

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    pipeline.run(&source, date(), &notifier);
    let first = durable_dump(&pipeline);
    let staged_first = pipeline.database().staged_records().expect("Failed to read staging");

    let summary = pipeline.run(&source, date(), &notifier);
    assert_eq!(summary.status, RunStatus::Success);
    assert_eq!(durable_dump(&pipeline), first);
    assert_eq!(pipeline.database().staged_records().expect("Failed to read staging"), staged_first);
    assert_eq!(pipeline.database().durable_count().expect("Failed to count"), 3);
}

#[test]
fn test_malformed_row_is_skipped_and_counted() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let export = write_export(
        dir.path(),
        &[
            "1700000000;V60;Pour over;18 g;4;Bean: Ethiopia",
            "not-a-time;V60;Pour over;18 g;4;Bean: Kenya",
            ";V60;Pour over;18 g;4;Bean: Brazil",
            "1700086400;Kalita;Pour over;20 g;5;Bean: Colombia",
        ],
    );

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    let summary = pipeline.run(&FileSource::new(&export), date(), &TracingNotifier::new("coffee.db"));

    assert_eq!(summary.status, RunStatus::PartialSuccess { skipped: 2 });
    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.anomalies.len(), 2);
    assert_eq!(summary.merged, 2);
    assert_eq!(pipeline.database().durable_count().expect("Failed to count"), 2);
}

#[test]
fn test_same_minute_keeps_later_timestamp() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    // 22:13:20 and 22:13:50 share a brew_date
    let export = write_export(
        dir.path(),
        &[
            "1700000030;V60;Pour over;18 g;5;Bean: Second",
            "1700000000;V60;Pour over;18 g;3;Bean: First",
        ],
    );

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    let summary = pipeline.run(&FileSource::new(&export), date(), &TracingNotifier::new("coffee.db"));

    assert_eq!(summary.staged, 2);
    assert_eq!(pipeline.database().durable_count().expect("Failed to count"), 1);
    let record = pipeline
        .database()
        .get_log("2023-11-14 22:13")
        .expect("Failed to query")
        .expect("Record should exist");
    assert_eq!(record.source_timestamp, 1_700_000_030);
    assert_eq!(record.bean.as_deref(), Some("Second"));
    assert_eq!(record.score, Some(5));
}

#[test]
fn test_missing_export_is_a_failure_that_keeps_prior_data() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_export(dir.path(), &["1700000000;V60;Pour over;18 g;4;Bean: Ethiopia"]);
    let source = DirectorySource::new(dir.path(), "coffee_logs");
    let notifier = TracingNotifier::new("coffee.db");

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    let first = pipeline.run(&source, date(), &notifier);
    assert_eq!(first.status, RunStatus::Success);

    let next_day = date().succ_opt().expect("valid date");
    let summary = pipeline.run(&source, next_day, &notifier);

    match &summary.status {
        RunStatus::Failure { error } => assert!(error.contains("Fetch error")),
        other => panic!("Expected failure, got {other:?}"),
    }
    assert_eq!(pipeline.database().durable_count().expect("Failed to count"), 1);
}

#[test]
fn test_grinder_variant_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("export.csv");
    fs::write(
        &path,
        "Timestamp;Recipe;Grinder;Score (out of 5);Note\n1700000000;V60;Comandante C40;4;Grind: 22\n",
    )
    .expect("Failed to write export");

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Grinder);
    pipeline.run(&FileSource::new(&path), date(), &TracingNotifier::new("coffee.db"));

    let record = pipeline
        .database()
        .get_log("2023-11-14 22:13")
        .expect("Failed to query")
        .expect("Record should exist");
    assert_eq!(record.grinder.as_deref(), Some("Comandante C40"));
}

#[test]
fn test_status_file_records_each_run() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let export = write_export(dir.path(), &["1700000000;V60;Pour over;18 g;4;Bean: Ethiopia"]);
    let status_path = dir.path().join("logs").join("status.log");
    let offset = chrono::FixedOffset::east_opt(0).expect("valid offset");
    let notifier = StatusFileNotifier::new(&status_path, "coffee.db", offset);

    let mut pipeline = pipeline(dir.path(), SchemaVariant::Classic);
    pipeline.run(&FileSource::new(&export), date(), &notifier);
    pipeline.run(&FileSource::new(dir.path().join("missing.csv")), date(), &notifier);

    let contents = fs::read_to_string(&status_path).expect("Failed to read status file");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(r#""status":"SUCCESS""#));
    assert!(lines[1].contains(r#""status":"FAIL""#));
}

#[test]
fn test_classic_notes_grinder_is_range_checked() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let export = write_export(
        dir.path(),
        &["1700000000;V60;Pour over;18 g;4;Bean: Kenya / Grinder: Comandante C40 / Grind: 55 / Flavor sweet / Balance: Balanced"],
    );
    let quality = QualityConfig {
        grind_setting_ranges: HashMap::from([("comandante_c40".to_string(), GrindRange { min: 10, max: 40 })]),
        ..QualityConfig::default()
    };

    let mut pipeline = pipeline_with_quality(dir.path(), SchemaVariant::Classic, &quality);
    let summary = pipeline.run(&FileSource::new(&export), date(), &TracingNotifier::new("coffee.db"));

    assert_eq!(summary.status, RunStatus::Success);
    assert!(summary
        .warnings
        .iter()
        .any(|w| matches!(w, DataQualityWarning::GrindSetting { grinder, value, .. } if grinder == "Comandante C40" && value == "55")));

    let staged = pipeline.database().staged_records().expect("Failed to read staging");
    assert_eq!(staged[0].grinder.as_deref(), Some("Comandante C40"));
    assert_eq!(staged[0].bean.as_deref(), Some("Kenya"));

    // the classic durable table has no grinder column
    let record = pipeline
        .database()
        .get_log("2023-11-14 22:13")
        .expect("Failed to query")
        .expect("Record should exist");
    assert!(record.grinder.is_none());
}
