// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use crate::geoip::MockLookup;
use crate::storage::InMemoryStorage;

fn a(name: &str, ttl: u32, ip: &str) -> Record {
    Record::new(name, RecordKind::A, ttl, vec![ip.to_string()])
}

fn cname(name: &str, target: &str) -> Record {
    Record::new(name, RecordKind::Cname, 0, vec![target.to_string()])
}

#[tokio::test]
async fn authoritative_exact_match() {
    let storage = InMemoryStorage::new();
    storage.create(a("example.com.", 300, "192.168.1.1")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("example.com.", RecordKind::A, Some("203.0.113.5".parse().unwrap()));

    let outcome = backend.resolve(&query).await.unwrap();
    assert!(outcome.authoritative);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].value, vec!["192.168.1.1".to_string()]);
    assert_eq!(outcome.records[0].ttl, 300);
}

#[tokio::test]
async fn cname_chain_resolves_to_terminal_a_record() {
    let storage = InMemoryStorage::new();
    storage.create(cname("a.example.com.", "b.example.com.")).await.unwrap();
    storage.create(cname("b.example.com.", "c.example.com.")).await.unwrap();
    storage.create(a("c.example.com.", 300, "10.0.0.1")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("a.example.com.", RecordKind::A, None);

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.records[0].kind, RecordKind::Cname);
    assert_eq!(outcome.records[1].kind, RecordKind::Cname);
    assert_eq!(outcome.records[2].kind, RecordKind::A);
    assert_eq!(outcome.records[2].value, vec!["10.0.0.1".to_string()]);
}

#[tokio::test]
async fn nxdomain_with_upstream_disabled() {
    let storage = InMemoryStorage::new();
    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("unknown.test.", RecordKind::A, None);

    let err = backend.resolve(&query).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::NotFound { .. })));
}

#[tokio::test]
async fn wildcard_match_does_not_fire_when_exact_record_exists() {
    let storage = InMemoryStorage::new();
    storage.create(a("*.example.com.", 300, "10.0.0.9")).await.unwrap();
    storage.create(a("foo.example.com.", 300, "10.0.0.1")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("foo.example.com.", RecordKind::A, None);

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records[0].value, vec!["10.0.0.1".to_string()]);
}

#[tokio::test]
async fn wildcard_match_fires_when_no_exact_record() {
    let storage = InMemoryStorage::new();
    storage.create(a("*.example.com.", 300, "10.0.0.9")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("anything.example.com.", RecordKind::A, None);

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records[0].value, vec!["10.0.0.9".to_string()]);
}

#[tokio::test]
async fn cname_cycle_terminates_with_accumulated_answers() {
    let storage = InMemoryStorage::new();
    storage.create(cname("a.example.com.", "b.example.com.")).await.unwrap();
    storage.create(cname("b.example.com.", "a.example.com.")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("a.example.com.", RecordKind::A, None);

    // A cycle is not an error: resolution stops at the repeated node with the
    // CNAME answers accumulated so far, not a terminal A record.
    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records.len(), 2);
    assert!(outcome.records.iter().all(|r| r.kind == RecordKind::Cname));
}

#[tokio::test]
async fn zero_ttl_is_replaced_with_default() {
    let storage = InMemoryStorage::new();
    storage.create(a("example.com.", 0, "192.168.1.1")).await.unwrap();

    let backend = Backend::new(storage, None, None);
    let query = QueryDescriptor::new("example.com.", RecordKind::A, None);

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records[0].ttl, DEFAULT_RECORD_TTL_SECS);
}

#[tokio::test]
async fn geoip_reorders_address_values_by_client_distance() {
    let storage = InMemoryStorage::new();
    storage
        .create(Record::new(
            "geo.example.com.",
            RecordKind::A,
            300,
            vec!["10.0.0.3".into(), "10.0.0.2".into(), "10.0.0.1".into()],
        ))
        .await
        .unwrap();

    let mut mock = MockLookup::default();
    mock.insert("10.0.0.1".parse().unwrap(), Coordinates { latitude: 43.6532, longitude: -79.3832 }); // Toronto
    mock.insert("10.0.0.2".parse().unwrap(), Coordinates { latitude: 51.5074, longitude: -0.1278 }); // London
    mock.insert("10.0.0.3".parse().unwrap(), Coordinates { latitude: 35.6762, longitude: 139.6503 }); // Tokyo
    mock.insert("203.0.113.5".parse().unwrap(), Coordinates { latitude: 40.7128, longitude: -74.0060 }); // New York

    let backend = Backend::new(storage, None, Some(Arc::new(mock)));
    let query = QueryDescriptor::new("geo.example.com.", RecordKind::A, Some("203.0.113.5".parse().unwrap()));

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records[0].value, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
}

#[tokio::test]
async fn unlocatable_client_preserves_storage_order() {
    let storage = InMemoryStorage::new();
    storage
        .create(Record::new(
            "geo.example.com.",
            RecordKind::A,
            300,
            vec!["10.0.0.3".into(), "10.0.0.2".into(), "10.0.0.1".into()],
        ))
        .await
        .unwrap();

    let mock = MockLookup::default();
    let backend = Backend::new(storage, None, Some(Arc::new(mock)));
    let query = QueryDescriptor::new("geo.example.com.", RecordKind::A, Some("203.0.113.5".parse().unwrap()));

    let outcome = backend.resolve(&query).await.unwrap();
    assert_eq!(outcome.records[0].value, vec!["10.0.0.3", "10.0.0.2", "10.0.0.1"]);
}
