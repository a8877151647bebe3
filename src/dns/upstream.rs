// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A thin async UDP forwarding client with per-server timeout and ordered
//! fallback, used when a query cannot be answered from Core Storage.

use crate::errors::{Error, ResolveError};
use crate::record::{Record, RecordKind};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Forwards queries to a fixed, ordered list of upstream DNS servers.
pub struct UpstreamClient {
    servers: Vec<SocketAddr>,
    per_server_timeout: Duration,
}

impl UpstreamClient {
    /// Builds a client forwarding to `servers` in order, with `per_server_timeout`
    /// applied to each attempt.
    #[must_use]
    pub fn new(servers: Vec<SocketAddr>, per_server_timeout: Duration) -> Self {
        Self {
            servers,
            per_server_timeout,
        }
    }

    /// Queries each configured server in order until one answers.
    ///
    /// A network error or timeout advances to the next server. An explicit
    /// `NXDOMAIN` or `SERVFAIL` is returned immediately without trying the
    /// remaining servers.
    ///
    /// # Errors
    /// Returns [`ResolveError::UpstreamUnavailable`] if every server failed,
    /// [`ResolveError::NotFound`] on an authoritative `NXDOMAIN`, or
    /// [`ResolveError::UpstreamMalformedResponse`] if a response could not
    /// be decoded.
    pub async fn forward(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, Error> {
        let query_name = Name::from_str(name).map_err(|err| ResolveError::UpstreamMalformedResponse {
            server: "n/a".into(),
            reason: format!("invalid query name '{name}': {err}"),
        })?;
        let record_type = to_hickory_type(kind);

        let mut last_reason = String::from("no upstream servers configured");
        for server in &self.servers {
            match self.query_one(*server, &query_name, record_type).await {
                Ok(Outcome::Answers(records)) => return Ok(records),
                Ok(Outcome::Nxdomain) => {
                    return Err(ResolveError::NotFound {
                        name: name.to_string(),
                        kind: kind.to_string(),
                    }
                    .into());
                }
                Ok(Outcome::Servfail) => {
                    return Err(ResolveError::UpstreamMalformedResponse {
                        server: server.to_string(),
                        reason: "upstream returned SERVFAIL".into(),
                    }
                    .into());
                }
                Err(reason) => {
                    last_reason = format!("{server}: {reason}");
                }
            }
        }

        Err(ResolveError::UpstreamUnavailable {
            name: name.to_string(),
            kind: kind.to_string(),
            reason: last_reason,
        }
        .into())
    }

    async fn query_one(&self, server: SocketAddr, name: &Name, record_type: RecordType) -> Result<Outcome, String> {
        let mut message = Message::new();
        message.set_id(rand::random::<u16>());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(name.clone(), record_type));

        let request_bytes = message.to_bytes().map_err(|err| format!("encode failure: {err}"))?;

        let bind_addr: SocketAddr = if server.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" }
            .parse()
            .expect("static bind address is valid");
        let socket = UdpSocket::bind(bind_addr).await.map_err(|err| format!("bind failure: {err}"))?;

        timeout(self.per_server_timeout, socket.send_to(&request_bytes, server))
            .await
            .map_err(|_| "send timed out".to_string())?
            .map_err(|err| format!("send failure: {err}"))?;

        let mut buf = vec![0u8; crate::constants::MAX_TCP_MESSAGE_SIZE];
        let len = timeout(self.per_server_timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| "recv timed out".to_string())?
            .map_err(|err| format!("recv failure: {err}"))?;

        let response = Message::from_bytes(&buf[..len]).map_err(|err| format!("decode failure: {err}"))?;

        match response.response_code() {
            ResponseCode::NXDomain => Ok(Outcome::Nxdomain),
            ResponseCode::ServFail => Ok(Outcome::Servfail),
            ResponseCode::NoError => Ok(Outcome::Answers(from_hickory_answers(response.answers()))),
            other => Err(format!("unexpected response code {other}")),
        }
    }
}

enum Outcome {
    Answers(Vec<Record>),
    Nxdomain,
    Servfail,
}

fn to_hickory_type(kind: RecordKind) -> RecordType {
    match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Cname => RecordType::CNAME,
        RecordKind::Mx => RecordType::MX,
        RecordKind::Txt => RecordType::TXT,
        RecordKind::Ns => RecordType::NS,
        RecordKind::Srv => RecordType::SRV,
        RecordKind::Ptr => RecordType::PTR,
        RecordKind::Soa => RecordType::SOA,
        RecordKind::Caa => RecordType::CAA,
    }
}

fn from_hickory_answers(answers: &[hickory_proto::rr::Record]) -> Vec<Record> {
    answers
        .iter()
        .filter_map(|rec| {
            let name = rec.name().to_string();
            let ttl = rec.ttl();
            let (kind, value) = rdata_to_value(rec.data())?;
            Some(Record::new(name, kind, ttl, value))
        })
        .collect()
}

fn rdata_to_value(rdata: &RData) -> Option<(RecordKind, Vec<String>)> {
    match rdata {
        RData::A(ip) => Some((RecordKind::A, vec![ip.0.to_string()])),
        RData::AAAA(ip) => Some((RecordKind::Aaaa, vec![ip.0.to_string()])),
        RData::CNAME(name) => Some((RecordKind::Cname, vec![name.0.to_string()])),
        RData::NS(name) => Some((RecordKind::Ns, vec![name.0.to_string()])),
        RData::PTR(name) => Some((RecordKind::Ptr, vec![name.0.to_string()])),
        RData::TXT(txt) => Some((
            RecordKind::Txt,
            txt.iter().map(|chunk| String::from_utf8_lossy(chunk).into_owned()).collect(),
        )),
        RData::MX(mx) => Some((
            RecordKind::Mx,
            vec![format!("{} {}", mx.preference(), mx.exchange())],
        )),
        RData::SRV(srv) => Some((
            RecordKind::Srv,
            vec![format!("{} {} {} {}", srv.priority(), srv.weight(), srv.port(), srv.target())],
        )),
        _ => None,
    }
}

#[cfg(test)]
#[path = "upstream_tests.rs"]
mod upstream_tests;
