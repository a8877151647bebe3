// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The DNS backend: resolves a query descriptor against Core Storage,
//! falling through to wildcard match, CNAME chain walk, and upstream
//! forwarding, then applies TTL and GeoIP reordering rules.

use crate::constants::{DEFAULT_RECORD_TTL_SECS, MAX_CNAME_CHAIN_DEPTH};
use crate::errors::{Error, ResolveError};
use crate::geoip::{sort_records_by_distance, Coordinates, IpLookup};
use crate::record::{ListFilter, QueryDescriptor, Record, RecordKey, RecordKind};
use crate::storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;

use super::upstream::UpstreamClient;

/// The outcome of resolving a single query.
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    /// Ordered answer records
    pub records: Vec<Record>,
    /// True if this server is authoritative for the answer; false if forwarded
    pub authoritative: bool,
}

/// Resolves queries against Core Storage, with optional upstream
/// fall-through and GeoIP-aware answer reordering.
pub struct Backend {
    storage: Arc<dyn Storage>,
    upstream: Option<UpstreamClient>,
    geoip: Option<Arc<dyn IpLookup>>,
    default_ttl: u32,
}

impl Backend {
    /// Builds a backend over `storage`, with optional upstream forwarding
    /// and GeoIP reordering.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, upstream: Option<UpstreamClient>, geoip: Option<Arc<dyn IpLookup>>) -> Self {
        Self {
            storage,
            upstream,
            geoip,
            default_ttl: DEFAULT_RECORD_TTL_SECS,
        }
    }

    /// Resolves `query` through the full pipeline: exact lookup, wildcard
    /// lookup, CNAME chain walk, upstream forward, then rule application.
    ///
    /// # Errors
    /// Returns [`ResolveError::NotFound`] if no local or upstream answer was
    /// found, or [`ResolveError::UpstreamUnavailable`] if upstream forwarding
    /// was attempted and every configured server failed.
    pub async fn resolve(&self, query: &QueryDescriptor) -> Result<ResolutionOutcome, Error> {
        let mut answers = self.resolve_chain(&query.name, query.kind).await;

        if answers.is_empty() {
            if let Some(upstream) = &self.upstream {
                let forwarded = upstream.forward(&query.name, query.kind).await?;
                return Ok(ResolutionOutcome {
                    records: self.apply_rules(forwarded, query.client_ip).await,
                    authoritative: false,
                });
            }
            return Err(ResolveError::NotFound {
                name: query.name.clone(),
                kind: query.kind.to_string(),
            }
            .into());
        }

        answers = self.apply_rules(answers, query.client_ip).await;
        Ok(ResolutionOutcome {
            records: answers,
            authoritative: true,
        })
    }

    /// Exact lookup, then wildcard lookup, then CNAME chain walk, all
    /// against Core Storage only (no upstream).
    async fn resolve_chain(&self, name: &str, kind: RecordKind) -> Vec<Record> {
        if let Some(record) = self.lookup_exact_or_wildcard(name, kind).await {
            return vec![record];
        }

        if kind == RecordKind::Cname {
            return Vec::new();
        }

        self.walk_cname_chain(name, kind).await
    }

    async fn lookup_exact_or_wildcard(&self, name: &str, kind: RecordKind) -> Option<Record> {
        if let Some(record) = self.storage.get(&RecordKey::new(name, kind)).await {
            return Some(record);
        }
        self.lookup_wildcard(name, kind).await
    }

    async fn lookup_wildcard(&self, name: &str, kind: RecordKind) -> Option<Record> {
        for suffix in wildcard_suffixes(name) {
            if let Some(record) = self.storage.get(&RecordKey::new(&suffix, kind)).await {
                return Some(record);
            }
        }
        None
    }

    async fn walk_cname_chain(&self, name: &str, kind: RecordKind) -> Vec<Record> {
        let mut answers = Vec::new();
        let mut visited = HashSet::new();
        let mut current = name.to_string();

        for _ in 0..MAX_CNAME_CHAIN_DEPTH {
            if !visited.insert(current.clone()) {
                break; // cycle detected; stop with answers accumulated so far
            }

            let Some(cname) = self.lookup_exact_or_wildcard(&current, RecordKind::Cname).await else {
                break;
            };
            let Some(target) = cname.value.first().cloned() else {
                break;
            };
            answers.push(cname);

            if let Some(target_record) = self.lookup_exact_or_wildcard(&target, kind).await {
                answers.push(target_record);
                return answers;
            }
            current = target;
        }

        // DepthExceeded or no terminal record: return accumulated CNAME answers, not an error.
        answers
    }

    async fn apply_rules(&self, records: Vec<Record>, client_ip: Option<std::net::IpAddr>) -> Vec<Record> {
        let mut records: Vec<Record> = records
            .into_iter()
            .map(|mut r| {
                if r.ttl == 0 {
                    r.ttl = self.default_ttl;
                }
                r
            })
            .collect();

        if let (Some(geoip), Some(ip)) = (&self.geoip, client_ip) {
            if let Ok(client_coords) = geoip.lookup(ip).await {
                records = self.reorder_addresses(records, client_coords, geoip.as_ref()).await;
            }
        }

        records
    }

    async fn reorder_addresses(
        &self,
        records: Vec<Record>,
        client: Coordinates,
        lookup: &dyn IpLookup,
    ) -> Vec<Record> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            out.push(sort_records_by_distance(record, client, lookup).await);
        }
        out
    }

    /// Lists all records under `prefix`, used by the ACME manager and the
    /// certificate status route; not part of the query resolution path.
    pub async fn list(&self, filter: &ListFilter) -> Vec<Record> {
        self.storage.list(filter).await
    }
}

/// Generates progressively shorter `*.<suffix>` wildcard candidates for
/// `name`, stripping one leftmost label at a time until the apex.
fn wildcard_suffixes(name: &str) -> Vec<String> {
    let trimmed = name.trim_end_matches('.');
    let labels: Vec<&str> = trimmed.split('.').collect();
    let mut suffixes = Vec::new();

    for i in 1..labels.len() {
        let suffix = labels[i..].join(".");
        suffixes.push(format!("*.{suffix}."));
    }

    suffixes
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod backend_tests;
