// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn canonicalize_name_lowercases_and_adds_trailing_dot() {
    assert_eq!(canonicalize_name("Example.COM"), "example.com.");
    assert_eq!(canonicalize_name("example.com."), "example.com.");
    assert_eq!(canonicalize_name("  example.com  "), "example.com.");
}

#[test]
fn record_new_canonicalises_name() {
    let rec = Record::new("Foo.Example.com", RecordKind::A, 60, vec!["10.0.0.1".into()]);
    assert_eq!(rec.name, "foo.example.com.");
}

#[test]
fn record_key_matches_record() {
    let rec = Record::new("foo.example.com.", RecordKind::Cname, 0, vec!["bar.example.com.".into()]);
    let key = rec.key();
    assert_eq!(key.name, "foo.example.com.");
    assert_eq!(key.kind, RecordKind::Cname);
}

#[test]
fn content_equals_ignores_name_and_kind() {
    let a = Record::new("a.example.com.", RecordKind::A, 300, vec!["1.1.1.1".into()]);
    let b = Record::new("a.example.com.", RecordKind::A, 300, vec!["1.1.1.1".into()]);
    let c = Record::new("a.example.com.", RecordKind::A, 300, vec!["2.2.2.2".into()]);
    assert!(a.content_equals(&b));
    assert!(!a.content_equals(&c));
}

#[test]
fn record_kind_round_trips_through_str() {
    for kind in [
        RecordKind::A,
        RecordKind::Aaaa,
        RecordKind::Cname,
        RecordKind::Mx,
        RecordKind::Txt,
        RecordKind::Ns,
        RecordKind::Srv,
        RecordKind::Ptr,
        RecordKind::Soa,
        RecordKind::Caa,
    ] {
        let parsed: RecordKind = kind.as_str().parse().unwrap();
        assert_eq!(parsed, kind);
    }
}

#[test]
fn record_kind_from_str_is_case_insensitive() {
    assert_eq!("aaaa".parse::<RecordKind>().unwrap(), RecordKind::Aaaa);
    assert_eq!("Cname".parse::<RecordKind>().unwrap(), RecordKind::Cname);
}

#[test]
fn record_kind_from_str_rejects_unknown() {
    assert!("BOGUS".parse::<RecordKind>().is_err());
}

#[test]
fn is_address_true_only_for_a_and_aaaa() {
    assert!(RecordKind::A.is_address());
    assert!(RecordKind::Aaaa.is_address());
    assert!(!RecordKind::Cname.is_address());
    assert!(!RecordKind::Txt.is_address());
}

#[test]
fn change_set_is_empty_when_all_buckets_empty() {
    assert!(ChangeSet::default().is_empty());

    let mut cs = ChangeSet::default();
    cs.deleted.push(RecordKey::new("a.example.com.", RecordKind::A));
    assert!(!cs.is_empty());
}

#[test]
fn record_serializes_type_field_as_type() {
    let rec = Record::new("a.example.com.", RecordKind::A, 60, vec!["10.0.0.1".into()]);
    let json = serde_json::to_value(&rec).unwrap();
    assert_eq!(json["type"], "A");
    assert!(json.get("kind").is_none());
}
