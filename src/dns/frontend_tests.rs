// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use crate::storage::InMemoryStorage;
use hickory_proto::op::Query;

fn build_query_message(name: &str, kind: RecordType) -> Message {
    let mut message = Message::new();
    message.set_id(42);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).unwrap(), kind));
    message
}

#[tokio::test]
async fn authoritative_answer_sets_aa_and_returns_record() {
    let storage = InMemoryStorage::new();
    storage
        .create(Record::new("example.com.", RecordKind::A, 300, vec!["192.168.1.1".into()]))
        .await
        .unwrap();

    let backend = Arc::new(Backend::new(storage, None, None));
    let frontend = Frontend::new(backend, false);

    let request = build_query_message("example.com.", RecordType::A);
    let response_bytes = frontend
        .handle_query(&request.to_bytes().unwrap(), "203.0.113.5".parse().unwrap(), "udp")
        .await;

    let response = Message::from_bytes(&response_bytes).unwrap();
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert_eq!(response.answers().len(), 1);
}

#[tokio::test]
async fn nxdomain_includes_soa_authority_record() {
    let storage = InMemoryStorage::new();
    let backend = Arc::new(Backend::new(storage, None, None));
    let frontend = Frontend::new(backend, false);

    let request = build_query_message("unknown.test.", RecordType::A);
    let response_bytes = frontend
        .handle_query(&request.to_bytes().unwrap(), "203.0.113.5".parse().unwrap(), "udp")
        .await;

    let response = Message::from_bytes(&response_bytes).unwrap();
    assert_eq!(response.response_code(), ResponseCode::NXDomain);
    assert_eq!(response.name_servers().len(), 1);
    assert_eq!(response.name_servers()[0].record_type(), RecordType::SOA);
}

#[tokio::test]
async fn malformed_request_yields_formerr() {
    let storage = InMemoryStorage::new();
    let backend = Arc::new(Backend::new(storage, None, None));
    let frontend = Frontend::new(backend, false);

    let response_bytes = frontend.handle_query(&[0xFF, 0x00, 0x01], "203.0.113.5".parse().unwrap(), "udp").await;
    let response = Message::from_bytes(&response_bytes).unwrap();
    assert_eq!(response.response_code(), ResponseCode::FormErr);
}

#[tokio::test]
async fn unsupported_query_type_yields_notimp() {
    let storage = InMemoryStorage::new();
    let backend = Arc::new(Backend::new(storage, None, None));
    let frontend = Frontend::new(backend, false);

    let request = build_query_message("example.com.", RecordType::ANY);
    let response_bytes = frontend
        .handle_query(&request.to_bytes().unwrap(), "203.0.113.5".parse().unwrap(), "udp")
        .await;

    let response = Message::from_bytes(&response_bytes).unwrap();
    assert_eq!(response.response_code(), ResponseCode::NotImp);
}

#[tokio::test]
async fn caa_query_returns_issue_answer() {
    let storage = InMemoryStorage::new();
    storage
        .create(Record::new("example.com.", RecordKind::Caa, 300, vec!["0 issue letsencrypt.org".into()]))
        .await
        .unwrap();

    let backend = Arc::new(Backend::new(storage, None, None));
    let frontend = Frontend::new(backend, false);

    let request = build_query_message("example.com.", RecordType::CAA);
    let response_bytes = frontend
        .handle_query(&request.to_bytes().unwrap(), "203.0.113.5".parse().unwrap(), "udp")
        .await;

    let response = Message::from_bytes(&response_bytes).unwrap();
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.answers().len(), 1);
    let Some(RData::CAA(caa)) = response.answers()[0].data() else {
        panic!("expected CAA rdata");
    };
    assert!(!caa.issuer_critical());
    assert_eq!(caa.tag().to_string(), "issue");
}

#[test]
fn parse_caa_rejects_unknown_tag() {
    assert!(parse_caa("0 unknown something").is_none());
}

#[test]
fn parse_caa_treats_empty_issue_value_as_no_authorized_ca() {
    let caa = parse_caa("128 issue ").unwrap();
    assert!(caa.issuer_critical());
}

#[test]
fn synthesize_soa_uses_queried_zone_as_mname_suffix() {
    let zone = Name::from_str("example.com.").unwrap();
    let record = synthesize_soa(&zone);
    assert_eq!(record.record_type(), RecordType::SOA);
    if let Some(RData::SOA(soa)) = record.data() {
        assert!(soa.mname().to_string().starts_with("ns1.example.com"));
    } else {
        panic!("expected SOA rdata");
    }
}
