// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use crate::record::RecordKind;
use crate::storage::InMemoryStorage;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn parse_records_file_parses_json_array() {
    let json = r#"[{"name":"example.com.","type":"A","ttl":300,"value":["192.168.1.1"]}]"#;
    let records = parse_records_file(json).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordKind::A);
}

#[test]
fn parse_records_file_rejects_malformed_json() {
    assert!(parse_records_file("not json").is_err());
}

#[test]
fn render_records_file_round_trips_through_parse() {
    let original = vec![Record::new("foo.example.com.", RecordKind::A, 60, vec!["10.0.0.1".into()])];
    let json = render_records_file(&original).unwrap();
    let parsed = parse_records_file(&json).unwrap();
    assert_eq!(parsed, original);
}

#[tokio::test]
async fn load_initial_is_a_no_op_when_file_is_missing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    let storage = InMemoryStorage::new();

    let adapter = FileAdapter::new(&path, storage.clone());
    adapter.load_initial().await;

    assert_eq!(storage.version().await, 0);
}

#[tokio::test]
async fn load_initial_populates_storage_from_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    tokio::fs::write(&path, r#"[{"name":"example.com.","type":"A","ttl":300,"value":["192.168.1.1"]}]"#)
        .await
        .unwrap();

    let storage = InMemoryStorage::new();
    let adapter = FileAdapter::new(&path, storage.clone());
    adapter.load_initial().await;

    let got = storage
        .get(&crate::record::RecordKey::new("example.com.", RecordKind::A))
        .await;
    assert!(got.is_some());
}

#[tokio::test]
async fn sync_outbound_writes_file_readable_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    let storage = InMemoryStorage::new();
    storage
        .create(Record::new("example.com.", RecordKind::A, 300, vec!["192.168.1.1".into()]))
        .await
        .unwrap();

    let adapter = FileAdapter::new(&path, storage);
    adapter.sync_outbound().await.unwrap();

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    let records = parse_records_file(&contents).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "example.com.");
}

#[tokio::test]
async fn run_inbound_reloads_storage_on_file_change() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    tokio::fs::write(&path, "[]").await.unwrap();

    let storage = InMemoryStorage::new();
    let adapter = FileAdapter::new(&path, storage.clone());
    let cancel = CancellationToken::new();

    let watch_cancel = cancel.clone();
    let watch_handle = tokio::spawn(async move {
        adapter.run_inbound(watch_cancel).await;
    });

    // Give the watcher time to register before triggering a change.
    tokio::time::sleep(Duration::from_millis(200)).await;
    tokio::fs::write(&path, r#"[{"name":"new.example.com.","type":"A","ttl":300,"value":["10.0.0.1"]}]"#)
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if storage.version().await > 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    cancel.cancel();
    let _ = watch_handle.await;

    assert!(storage.version().await > 0, "expected file watcher to trigger a reload");
}
