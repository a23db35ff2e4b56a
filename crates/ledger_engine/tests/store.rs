use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use ledger_engine::{
    ArticleRecord, JsonFileStore, Ledger, StateStore, CURRENT_SCHEMA_VERSION,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logging() {
    ledger_logging::initialize_for_tests();
}

fn quarantined_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("ledger.json.corrupt-"))
        .collect();
    names.sort();
    names
}

fn sample_ledger() -> Ledger {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let mut ledger = Ledger::new(t0);
    let record = ArticleRecord::new("https://example.com/a", "alpha")
        .unwrap()
        .with_title("Alpha")
        .with_author("Ada");
    ledger.record_success(&record, "h-alpha".into(), t0);
    ledger.record_error("https://example.com/b", "timeout", t0);
    ledger
}

#[test]
fn missing_file_loads_empty_ledger() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp.path().join("ledger.json"));
    let now = Utc::now();

    let ledger = store.load(now);
    assert!(ledger.is_empty());
    assert_eq!(ledger.version(), CURRENT_SCHEMA_VERSION);
    assert_eq!(ledger.created_at(), now);
}

#[test]
fn save_then_load_round_trips_entries() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = JsonFileStore::new(temp.path().join("ledger.json"));
    let ledger = sample_ledger();

    store.save(&ledger).unwrap();
    let loaded = store.load(Utc::now());

    assert_eq!(loaded, ledger);
    let entries: Vec<_> = loaded.entries().cloned().collect();
    let expected: Vec<_> = ledger.entries().cloned().collect();
    assert_eq!(entries, expected);
}

#[test]
fn saved_document_is_readable_json() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    JsonFileStore::new(&path).save(&sample_ledger()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with('\n'));
    assert!(text.lines().count() > 10, "expected pretty-printed output");

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["version"], CURRENT_SCHEMA_VERSION);
    assert_eq!(value["entries"]["https://example.com/a"]["status"], "completed");
    assert_eq!(value["entries"]["https://example.com/b"]["status"], "error");
    assert_eq!(value["entries"]["https://example.com/b"]["error"], "timeout");
    assert!(value["entries"]["https://example.com/b"]
        .get("content_hash")
        .is_none());
    assert_eq!(value["statistics"]["total_processed"], 1);
    assert_eq!(value["statistics"]["total_errors"], 1);
}

#[test]
fn garbage_bytes_load_as_empty_and_are_quarantined() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    fs::write(&path, [0xff, 0xfe, 0x00, b'{', b'x']).unwrap();
    let store = JsonFileStore::new(&path);

    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 15, 0).unwrap();
    let ledger = store.load(now);
    assert!(ledger.is_empty());
    assert_eq!(ledger.version(), CURRENT_SCHEMA_VERSION);
    assert!(!path.exists());
    assert_eq!(
        quarantined_files(temp.path()),
        vec!["ledger.json.corrupt-20240701T091500Z".to_string()]
    );
}

#[test]
fn repeated_corruption_keeps_every_quarantined_copy() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    let store = JsonFileStore::new(&path);
    let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 15, 0).unwrap();

    fs::write(&path, "first broken copy").unwrap();
    assert!(store.load(now).is_empty());
    fs::write(&path, "second broken copy").unwrap();
    assert!(store.load(now).is_empty());

    let names = quarantined_files(temp.path());
    assert_eq!(
        names,
        vec![
            "ledger.json.corrupt-20240701T091500Z".to_string(),
            "ledger.json.corrupt-20240701T091500Z-1".to_string(),
        ]
    );
    assert_eq!(
        fs::read_to_string(temp.path().join(&names[0])).unwrap(),
        "first broken copy"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join(&names[1])).unwrap(),
        "second broken copy"
    );
}

#[test]
fn quarantine_can_be_disabled() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    fs::write(&path, "not json at all").unwrap();
    let store = JsonFileStore::new(&path).quarantine_corrupt(false);

    assert!(store.load(Utc::now()).is_empty());
    assert!(path.exists());
    assert!(quarantined_files(temp.path()).is_empty());
}

#[test]
fn whitespace_only_file_loads_empty() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    fs::write(&path, "  \n\t\n").unwrap();
    let store = JsonFileStore::new(&path);

    assert!(store.load(Utc::now()).is_empty());
    assert!(path.exists());
}

#[test]
fn json_of_the_wrong_shape_loads_empty() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    fs::write(&path, r#"{"entries": [1, 2, 3]}"#).unwrap();

    assert!(JsonFileStore::new(&path).load(Utc::now()).is_empty());
}

#[test]
fn entry_violating_invariants_loads_empty() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    let doc = r#"{
  "version": "1.0",
  "created_at": "2024-01-01T00:00:00Z",
  "last_updated": "2024-01-02T00:00:00Z",
  "entries": {
    "https://example.com/a": {
      "key": "https://example.com/a",
      "status": "completed",
      "process_count": 1,
      "first_processed_at": "2024-01-01T00:00:00Z",
      "last_processed_at": "2024-01-01T00:00:00Z"
    }
  },
  "statistics": { "total_processed": 1, "total_updated": 0, "total_errors": 0 }
}"#;
    fs::write(&path, doc).unwrap();

    assert!(JsonFileStore::new(&path).load(Utc::now()).is_empty());
}

#[test]
fn last_updated_behind_an_entry_loads_empty() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    let doc = r#"{
  "version": "1.0",
  "created_at": "2024-01-01T00:00:00Z",
  "last_updated": "2024-01-01T00:00:00Z",
  "entries": {
    "https://example.com/a": {
      "key": "https://example.com/a",
      "status": "completed",
      "content_hash": "abc",
      "process_count": 1,
      "first_processed_at": "2024-01-01T00:00:00Z",
      "last_processed_at": "2024-01-05T00:00:00Z"
    }
  },
  "statistics": { "total_processed": 1, "total_updated": 0, "total_errors": 0 }
}"#;
    fs::write(&path, doc).unwrap();

    assert!(JsonFileStore::new(&path).load(Utc::now()).is_empty());
}

#[test]
fn older_schema_version_is_accepted() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ledger.json");
    let doc = r#"{
  "version": "0.9",
  "created_at": "2024-01-01T00:00:00Z",
  "last_updated": "2024-01-01T00:00:00Z",
  "entries": {}
}"#;
    fs::write(&path, doc).unwrap();

    let ledger = JsonFileStore::new(&path).load(Utc::now());
    assert_eq!(ledger.version(), "0.9");
    assert_eq!(ledger.statistics().total_processed, 0);
}

#[test]
fn save_into_unwritable_location_fails() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "x").unwrap();
    let store = JsonFileStore::new(blocker.join("ledger.json"));

    assert!(store.save(&sample_ledger()).is_err());
}
