// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use hickory_proto::rr::rdata::A as ARdata;
use hickory_proto::rr::RData;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;

async fn spawn_fake_server(response_code: ResponseCode, answer_ip: Option<Ipv4Addr>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let Ok(request) = Message::from_bytes(&buf[..len]) else {
            return;
        };

        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(response_code);
        for query in request.queries() {
            response.add_query(query.clone());
        }
        if let Some(ip) = answer_ip {
            let query = request.queries().first().unwrap();
            let mut record = hickory_proto::rr::Record::with(query.name().clone(), RecordType::A, 300);
            record.set_data(RData::A(ARdata(ip)));
            response.add_answer(record);
        }

        let bytes = response.to_bytes().unwrap();
        let _ = socket.send_to(&bytes, peer).await;
    });

    addr
}

#[tokio::test]
async fn forward_returns_answer_from_first_server() {
    let server = spawn_fake_server(ResponseCode::NoError, Some(Ipv4Addr::new(93, 184, 216, 34))).await;
    let client = UpstreamClient::new(vec![server], Duration::from_secs(2));

    let records = client.forward("example.org.", RecordKind::A).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value, vec!["93.184.216.34".to_string()]);
}

#[tokio::test]
async fn forward_returns_not_found_on_nxdomain_without_trying_next_server() {
    let server = spawn_fake_server(ResponseCode::NXDomain, None).await;
    let unreachable: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let client = UpstreamClient::new(vec![server, unreachable], Duration::from_millis(500));

    let err = client.forward("unknown.test.", RecordKind::A).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::NotFound { .. })));
}

#[tokio::test]
async fn forward_falls_back_to_second_server_on_timeout() {
    // 127.0.0.1:1 is a privileged, unbound port that will not respond; the
    // client must advance to the second, working server within its timeout.
    let unreachable: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let server = spawn_fake_server(ResponseCode::NoError, Some(Ipv4Addr::new(93, 184, 216, 34))).await;
    let client = UpstreamClient::new(vec![unreachable, server], Duration::from_millis(300));

    let records = client.forward("example.org.", RecordKind::A).await.unwrap();
    assert_eq!(records[0].value, vec!["93.184.216.34".to_string()]);
}

#[tokio::test]
async fn forward_fails_when_every_server_is_unreachable() {
    let unreachable: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let client = UpstreamClient::new(vec![unreachable], Duration::from_millis(200));

    let err = client.forward("example.org.", RecordKind::A).await.unwrap_err();
    assert!(matches!(err, Error::Resolve(ResolveError::UpstreamUnavailable { .. })));
}
