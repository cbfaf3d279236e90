use coffee_log_etl::schema::coffee_logs;
use coffee_log_etl::{CanonicalLogRecord, Database, SchemaVariant};
use tempfile::TempDir;

fn record(timestamp: i64, brew_date: &str) -> CanonicalLogRecord {
    CanonicalLogRecord {
        source_timestamp: timestamp,
        brew_date: brew_date.to_string(),
        recipe: Some("V60".to_string()),
        method: Some("Pour over".to_string()),
        coffee_grams: Some(18.0),
        score: Some(4),
        grinder: Some("Comandante C40".to_string()),
        bean: Some("Ethiopia".to_string()),
        grind: Some("22".to_string()),
        flavor: Some("very sweet".to_string()),
        balance: Some("Balanced".to_string()),
        notes: Some("Bean: Ethiopia / Grind: 22".to_string()),
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("coffee.db").to_string_lossy().into_owned()
}

#[test]
fn test_database_creation_and_initialization() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(&db_path(&dir), SchemaVariant::Classic).expect("Failed to create database");

    assert_eq!(db.variant(), SchemaVariant::Classic);
    assert_eq!(db.staged_count().expect("Failed to count"), 0);
    assert_eq!(db.durable_count().expect("Failed to count"), 0);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    {
        let mut db = Database::open(&db_path(&dir), SchemaVariant::Classic).expect("Failed to create database");
        db.staging().load(&[record(1_700_000_000, "2023-11-14 22:13")]).expect("Failed to stage");
        db.merger().merge().expect("Failed to merge");
    }

    let db = Database::open(&db_path(&dir), SchemaVariant::Classic).expect("Failed to reopen database");
    let stored = db.get_log("2023-11-14 22:13").expect("Failed to query").expect("Record should exist");
    assert_eq!(stored.bean.as_deref(), Some("Ethiopia"));
    // raw notes stay in staging only
    assert!(stored.notes.is_none());
}

#[test]
fn test_classic_database_upgraded_for_grinder_variant() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    drop(Database::open(&db_path(&dir), SchemaVariant::Classic).expect("Failed to create database"));

    let mut db = Database::open(&db_path(&dir), SchemaVariant::Grinder).expect("Failed to reopen database");
    assert!(db.has_column(coffee_logs::TABLE, coffee_logs::GRINDER).expect("Failed to inspect schema"));

    db.staging().load(&[record(1_700_000_000, "2023-11-14 22:13")]).expect("Failed to stage");
    db.merger().merge().expect("Failed to merge");
    let stored = db.get_log("2023-11-14 22:13").expect("Failed to query").expect("Record should exist");
    assert_eq!(stored.grinder.as_deref(), Some("Comandante C40"));
}

#[test]
fn test_classic_variant_on_grinder_database_writes_null_grinder() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    drop(Database::open(&db_path(&dir), SchemaVariant::Grinder).expect("Failed to create database"));

    let mut db = Database::open(&db_path(&dir), SchemaVariant::Classic).expect("Failed to reopen database");
    db.staging().load(&[record(1_700_000_000, "2023-11-14 22:13")]).expect("Failed to stage");
    assert_eq!(db.merger().merge().expect("Failed to merge"), 1);

    let stored = db.get_log("2023-11-14 22:13").expect("Failed to query").expect("Record should exist");
    assert!(stored.grinder.is_none());
}

#[test]
fn test_merge_twice_is_idempotent() {
    let mut db = Database::open_in_memory(SchemaVariant::Classic).expect("Failed to create database");
    db.staging()
        .load(&[record(1_700_000_000, "2023-11-14 22:13"), record(1_700_086_400, "2023-11-15 22:13")])
        .expect("Failed to stage");

    db.merger().merge().expect("Failed to merge");
    let first = db.durable_records(None).expect("Failed to read");
    db.merger().merge().expect("Failed to merge");

    assert_eq!(db.durable_records(None).expect("Failed to read"), first);
}

#[test]
fn test_merge_replaces_existing_brew() {
    let mut db = Database::open_in_memory(SchemaVariant::Classic).expect("Failed to create database");
    db.staging().load(&[record(1_700_000_000, "2023-11-14 22:13")]).expect("Failed to stage");
    db.merger().merge().expect("Failed to merge");

    let mut corrected = record(1_700_000_000, "2023-11-14 22:13");
    corrected.score = Some(5);
    db.staging().load(&[corrected]).expect("Failed to stage");
    db.merger().merge().expect("Failed to merge");

    assert_eq!(db.durable_count().expect("Failed to count"), 1);
    let stored = db.get_log("2023-11-14 22:13").expect("Failed to query").expect("Record should exist");
    assert_eq!(stored.score, Some(5));
}

#[test]
fn test_delta_load_then_merge_keeps_earlier_rows() {
    let mut db = Database::open_in_memory(SchemaVariant::Classic).expect("Failed to create database");
    db.staging().load(&[record(1_700_000_000, "2023-11-14 22:13")]).expect("Failed to stage");
    db.staging().load_delta(&[record(1_700_086_400, "2023-11-15 22:13")]).expect("Failed to stage delta");

    assert_eq!(db.staged_count().expect("Failed to count"), 2);
    assert_eq!(db.merger().merge().expect("Failed to merge"), 2);
}

#[test]
fn test_durable_records_newest_first_with_limit() {
    let mut db = Database::open_in_memory(SchemaVariant::Classic).expect("Failed to create database");
    db.staging()
        .load(&[
            record(1_700_000_000, "2023-11-14 22:13"),
            record(1_700_086_400, "2023-11-15 22:13"),
            record(1_700_172_800, "2023-11-16 22:13"),
        ])
        .expect("Failed to stage");
    db.merger().merge().expect("Failed to merge");

    let recent = db.durable_records(Some(2)).expect("Failed to read");
    let dates: Vec<&str> = recent.iter().map(|r| r.brew_date.as_str()).collect();
    assert_eq!(dates, vec!["2023-11-16 22:13", "2023-11-15 22:13"]);
}
