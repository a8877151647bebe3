// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The DNS frontend: wire-level UDP/TCP listeners, query-descriptor
//! construction, and response rendering.
//!
//! One task is spawned per inbound UDP datagram and per accepted TCP
//! connection.

use crate::errors::Error;
use crate::metrics;
use crate::record::{QueryDescriptor, Record, RecordKind};
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::{self, SOA};
use hickory_proto::rr::{Name, RData, Record as HickoryRecord, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinEncodable};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::backend::Backend;

/// Default SOA fields synthesised for NXDOMAIN authority sections. This
/// server does not manage zone transfers, so these are fixed, not
/// zone-configurable.
const SOA_REFRESH_SECS: i32 = 3600;
const SOA_RETRY_SECS: i32 = 900;
const SOA_EXPIRE_SECS: i32 = 604_800;
const SOA_MINIMUM_SECS: u32 = 300;

/// Parses inbound wire messages, delegates to the backend, and renders
/// answers (or NXDOMAIN/SERVFAIL) back onto the wire.
pub struct Frontend {
    backend: Arc<Backend>,
    upstream_enabled: bool,
}

impl Frontend {
    /// Builds a frontend over `backend`. `upstream_enabled` controls the RA
    /// (recursion-available) bit on every response.
    #[must_use]
    pub fn new(backend: Arc<Backend>, upstream_enabled: bool) -> Self {
        Self {
            backend,
            upstream_enabled,
        }
    }

    /// Runs the UDP listener loop until `cancel` fires. Each datagram is
    /// answered on its own spawned task.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be bound.
    pub async fn run_udp(self: Arc<Self>, listen: SocketAddr, cancel: CancellationToken) -> Result<(), Error> {
        let socket = Arc::new(
            UdpSocket::bind(listen)
                .await
                .map_err(|err| Error::Fatal(format!("failed to bind UDP listener on {listen}: {err}")))?,
        );
        let mut buf = vec![0u8; crate::constants::MAX_UDP_MESSAGE_SIZE];

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                recv = socket.recv_from(&mut buf) => {
                    let (len, peer) = match recv {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(error = %err, "udp recv failed");
                            continue;
                        }
                    };
                    let request = buf[..len].to_vec();
                    let frontend = Arc::clone(&self);
                    let socket = Arc::clone(&socket);
                    tokio::spawn(async move {
                        let response = frontend.handle_query(&request, peer.ip(), "udp").await;
                        if let Err(err) = socket.send_to(&response, peer).await {
                            warn!(error = %err, client = %peer, "udp send failed");
                        }
                    });
                }
            }
        }
    }

    /// Runs the TCP listener loop until `cancel` fires. Each connection is
    /// handled on its own spawned task; one length-prefixed message per
    /// connection is supported.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be bound.
    pub async fn run_tcp(self: Arc<Self>, listen: SocketAddr, cancel: CancellationToken) -> Result<(), Error> {
        let listener = TcpListener::bind(listen)
            .await
            .map_err(|err| Error::Fatal(format!("failed to bind TCP listener on {listen}: {err}")))?;

        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(error = %err, "tcp accept failed");
                            continue;
                        }
                    };
                    let frontend = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(err) = frontend.serve_tcp_connection(stream, peer).await {
                            debug!(error = %err, client = %peer, "tcp connection ended");
                        }
                    });
                }
            }
        }
    }

    async fn serve_tcp_connection(
        &self,
        mut stream: tokio::net::TcpStream,
        peer: SocketAddr,
    ) -> Result<(), Error> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let len = stream
            .read_u16()
            .await
            .map_err(|err| Error::Transient(format!("tcp read length prefix: {err}")))?;
        let mut buf = vec![0u8; len as usize];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|err| Error::Transient(format!("tcp read message: {err}")))?;

        let response = self.handle_query(&buf, peer.ip(), "tcp").await;
        let prefix = u16::try_from(response.len()).unwrap_or(u16::MAX);
        stream
            .write_u16(prefix)
            .await
            .map_err(|err| Error::Transient(format!("tcp write length prefix: {err}")))?;
        stream
            .write_all(&response[..prefix as usize])
            .await
            .map_err(|err| Error::Transient(format!("tcp write message: {err}")))?;
        Ok(())
    }

    /// Parses `request_bytes`, resolves the first question, and renders the
    /// wire response. Returns a SERVFAIL response if the request itself
    /// cannot be parsed. `transport` (`"udp"` or `"tcp"`) is recorded on the
    /// query latency histogram.
    pub async fn handle_query(&self, request_bytes: &[u8], client_ip: IpAddr, transport: &str) -> Vec<u8> {
        let request = match Message::from_bytes(request_bytes) {
            Ok(m) => m,
            Err(err) => {
                debug!(error = %err, "failed to parse inbound dns message");
                return Self::error_response(0, ResponseCode::FormErr);
            }
        };

        let Some(question) = request.queries().first() else {
            return Self::error_response(request.id(), ResponseCode::FormErr);
        };

        let Some(kind) = from_hickory_type(question.query_type()) else {
            return Self::error_response(request.id(), ResponseCode::NotImp);
        };

        let started = Instant::now();
        let descriptor = QueryDescriptor::new(question.name().to_string(), kind, Some(client_ip));

        match self.backend.resolve(&descriptor).await {
            Ok(outcome) => {
                let label = if outcome.authoritative { "authoritative" } else { "forwarded" };
                metrics::record_query(kind.as_str(), label, transport, started.elapsed());
                self.render_answer(&request, outcome.records, outcome.authoritative)
            }
            Err(Error::Resolve(crate::errors::ResolveError::NotFound { .. })) => {
                metrics::record_query(kind.as_str(), "nxdomain", transport, started.elapsed());
                self.render_nxdomain(&request, question.name())
            }
            Err(err) => {
                warn!(error = %err, "query resolution failed");
                metrics::record_query(kind.as_str(), "servfail", transport, started.elapsed());
                Self::error_response(request.id(), ResponseCode::ServFail)
            }
        }
    }

    fn render_answer(&self, request: &Message, records: Vec<Record>, authoritative: bool) -> Vec<u8> {
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(ResponseCode::NoError);
        response.set_authoritative(authoritative);
        response.set_recursion_available(self.upstream_enabled);
        response.set_recursion_desired(request.recursion_desired());
        for query in request.queries() {
            response.add_query(query.clone());
        }

        for record in records {
            for hickory_record in to_hickory_records(&record) {
                response.add_answer(hickory_record);
            }
        }

        response.to_bytes().unwrap_or_else(|_| Self::error_response(request.id(), ResponseCode::ServFail))
    }

    fn render_nxdomain(&self, request: &Message, queried_name: &Name) -> Vec<u8> {
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_response_code(ResponseCode::NXDomain);
        response.set_authoritative(!self.upstream_enabled);
        response.set_recursion_available(self.upstream_enabled);
        for query in request.queries() {
            response.add_query(query.clone());
        }
        response.add_name_server(synthesize_soa(queried_name));

        response.to_bytes().unwrap_or_else(|_| Self::error_response(request.id(), ResponseCode::ServFail))
    }

    fn error_response(id: u16, code: ResponseCode) -> Vec<u8> {
        let mut response = Message::new();
        response.set_id(id);
        response.set_message_type(MessageType::Response);
        response.set_response_code(code);
        response.to_bytes().unwrap_or_default()
    }
}

fn synthesize_soa(zone: &Name) -> HickoryRecord {
    let mname = Name::from_str(&format!("ns1.{zone}")).unwrap_or_else(|_| zone.clone());
    let rname = Name::from_str(&format!("hostmaster.{zone}")).unwrap_or_else(|_| zone.clone());
    let soa = SOA::new(
        mname,
        rname,
        1,
        SOA_REFRESH_SECS,
        SOA_RETRY_SECS,
        SOA_EXPIRE_SECS,
        SOA_MINIMUM_SECS,
    );
    let mut record = HickoryRecord::with(zone.clone(), RecordType::SOA, SOA_MINIMUM_SECS);
    record.set_data(RData::SOA(soa));
    record
}

fn from_hickory_type(rt: RecordType) -> Option<RecordKind> {
    match rt {
        RecordType::A => Some(RecordKind::A),
        RecordType::AAAA => Some(RecordKind::Aaaa),
        RecordType::CNAME => Some(RecordKind::Cname),
        RecordType::MX => Some(RecordKind::Mx),
        RecordType::TXT => Some(RecordKind::Txt),
        RecordType::NS => Some(RecordKind::Ns),
        RecordType::SRV => Some(RecordKind::Srv),
        RecordType::PTR => Some(RecordKind::Ptr),
        RecordType::SOA => Some(RecordKind::Soa),
        RecordType::CAA => Some(RecordKind::Caa),
        _ => None,
    }
}

fn to_hickory_records(record: &Record) -> Vec<HickoryRecord> {
    let Ok(name) = Name::from_str(&record.name) else {
        return Vec::new();
    };

    match record.kind {
        RecordKind::A => record
            .value
            .iter()
            .filter_map(|v| v.parse().ok())
            .map(|ip| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::A, record.ttl);
                r.set_data(RData::A(rdata::A(ip)));
                r
            })
            .collect(),
        RecordKind::Aaaa => record
            .value
            .iter()
            .filter_map(|v| v.parse().ok())
            .map(|ip| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::AAAA, record.ttl);
                r.set_data(RData::AAAA(rdata::AAAA(ip)));
                r
            })
            .collect(),
        RecordKind::Cname => record
            .value
            .iter()
            .filter_map(|v| Name::from_str(v).ok())
            .map(|target| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::CNAME, record.ttl);
                r.set_data(RData::CNAME(rdata::CNAME(target)));
                r
            })
            .collect(),
        RecordKind::Ns => record
            .value
            .iter()
            .filter_map(|v| Name::from_str(v).ok())
            .map(|target| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::NS, record.ttl);
                r.set_data(RData::NS(rdata::NS(target)));
                r
            })
            .collect(),
        RecordKind::Ptr => record
            .value
            .iter()
            .filter_map(|v| Name::from_str(v).ok())
            .map(|target| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::PTR, record.ttl);
                r.set_data(RData::PTR(rdata::PTR(target)));
                r
            })
            .collect(),
        RecordKind::Txt => vec![{
            let mut r = HickoryRecord::with(name.clone(), RecordType::TXT, record.ttl);
            r.set_data(RData::TXT(rdata::TXT::new(record.value.clone())));
            r
        }],
        RecordKind::Mx => record
            .value
            .iter()
            .filter_map(|v| parse_mx(v))
            .map(|(pref, exchange)| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::MX, record.ttl);
                r.set_data(RData::MX(rdata::MX::new(pref, exchange)));
                r
            })
            .collect(),
        RecordKind::Srv => record
            .value
            .iter()
            .filter_map(|v| parse_srv(v))
            .map(|(priority, weight, port, target)| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::SRV, record.ttl);
                r.set_data(RData::SRV(rdata::SRV::new(priority, weight, port, target)));
                r
            })
            .collect(),
        RecordKind::Caa => record
            .value
            .iter()
            .filter_map(|v| parse_caa(v))
            .map(|data| {
                let mut r = HickoryRecord::with(name.clone(), RecordType::CAA, record.ttl);
                r.set_data(RData::CAA(data));
                r
            })
            .collect(),
        RecordKind::Soa => Vec::new(),
    }
}

/// Parses a CAA value stored as `"<flags> <tag> <value>"`, e.g.
/// `"0 issue letsencrypt.org"` or `"128 iodef mailto:admin@example.com"`.
/// `issue`/`issuewild` treat an empty value as "no CA authorized".
fn parse_caa(value: &str) -> Option<rdata::CAA> {
    let mut parts = value.splitn(3, char::is_whitespace);
    let flags: u8 = parts.next()?.parse().ok()?;
    let tag = parts.next()?;
    let rest = parts.next().unwrap_or("").trim();
    let issuer_critical = flags != 0;

    match tag {
        "issue" => {
            let ca_name = if rest.is_empty() { None } else { Name::from_str(rest).ok() };
            Some(rdata::CAA::new_issue(issuer_critical, ca_name, Vec::new()))
        }
        "issuewild" => {
            let ca_name = if rest.is_empty() { None } else { Name::from_str(rest).ok() };
            Some(rdata::CAA::new_issuewild(issuer_critical, ca_name, Vec::new()))
        }
        "iodef" => Url::parse(rest).ok().map(|url| rdata::CAA::new_iodef(issuer_critical, url)),
        _ => None,
    }
}

fn parse_mx(value: &str) -> Option<(u16, Name)> {
    let mut parts = value.split_whitespace();
    let preference: u16 = parts.next()?.parse().ok()?;
    let exchange = Name::from_str(parts.next()?).ok()?;
    Some((preference, exchange))
}

fn parse_srv(value: &str) -> Option<(u16, u16, u16, Name)> {
    let mut parts = value.split_whitespace();
    let priority: u16 = parts.next()?.parse().ok()?;
    let weight: u16 = parts.next()?.parse().ok()?;
    let port: u16 = parts.next()?.parse().ok()?;
    let target = Name::from_str(parts.next()?).ok()?;
    Some((priority, weight, port, target))
}

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod frontend_tests;
