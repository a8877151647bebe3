// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Value objects shared by Core Storage, the resolution pipeline, and the
//! external source adapters: records, record kinds, query descriptors,
//! change sets, and storage events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// The DNS record kinds this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name (alias) record
    Cname,
    /// Mail exchange record
    Mx,
    /// Text record
    Txt,
    /// Nameserver delegation record
    Ns,
    /// Service location record
    Srv,
    /// Pointer record (reverse DNS)
    Ptr,
    /// Start of authority record
    Soa,
    /// Certificate authority authorization record
    Caa,
}

impl RecordKind {
    /// Returns the conventional wire-format name (e.g. `"AAAA"`, `"CNAME"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Ptr => "PTR",
            Self::Soa => "SOA",
            Self::Caa => "CAA",
        }
    }

    /// True for the address kinds GeoIP reordering applies to.
    #[must_use]
    pub fn is_address(self) -> bool {
        matches!(self, Self::A | Self::Aaaa)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "PTR" => Ok(Self::Ptr),
            "SOA" => Ok(Self::Soa),
            "CAA" => Ok(Self::Caa),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

/// A DNS record. Uniquely identified by `(name, kind)` within Core Storage.
///
/// `name` is stored canonicalised to a lowercase, trailing-dot fully qualified
/// domain name. `value` is an ordered sequence of strings whose interpretation
/// depends on `kind`: a single target for CNAME, `"priority weight port target"`
/// for SRV, `"priority exchange"` for MX, `"flags tag value"` for CAA
/// (e.g. `"0 issue letsencrypt.org"`), and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Fully qualified domain name, lowercase, trailing dot
    pub name: String,
    /// Record kind
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Time to live in seconds; zero means "use the configured default"
    pub ttl: u32,
    /// Ordered record values
    pub value: Vec<String>,
}

impl Record {
    /// Builds a record, canonicalising `name` to lowercase with a trailing dot.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RecordKind, ttl: u32, value: Vec<String>) -> Self {
        Self {
            name: canonicalize_name(&name.into()),
            kind,
            ttl,
            value,
        }
    }

    /// The `(name, kind)` key identifying this record within the store.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// Two records are "unchanged" for diffing purposes when their TTL and
    /// value sequence are identical (order matters).
    #[must_use]
    pub fn content_equals(&self, other: &Record) -> bool {
        self.ttl == other.ttl && self.value == other.value
    }
}

/// Lowercases a name and ensures it ends with a trailing dot.
#[must_use]
pub fn canonicalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    if lower.ends_with('.') {
        lower
    } else {
        format!("{lower}.")
    }
}

/// The unique key identifying a record within Core Storage: `(name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Fully qualified domain name, lowercase, trailing dot
    pub name: String,
    /// Record kind
    pub kind: RecordKind,
}

impl RecordKey {
    /// Builds a key, canonicalising `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            name: canonicalize_name(&name.into()),
            kind,
        }
    }
}

/// An optional name-prefix / kind filter for `List`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Only return records whose name starts with this prefix
    pub name_prefix: Option<String>,
    /// Only return records of this kind
    pub kind: Option<RecordKind>,
}

/// A query descriptor flowing from the frontend into the backend.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    /// Fully qualified queried name
    pub name: String,
    /// Queried record kind
    pub kind: RecordKind,
    /// Client IP extracted from the transport, used for GeoIP ordering
    pub client_ip: Option<IpAddr>,
}

impl QueryDescriptor {
    /// Builds a descriptor, canonicalising `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RecordKind, client_ip: Option<IpAddr>) -> Self {
        Self {
            name: canonicalize_name(&name.into()),
            kind,
            client_ip,
        }
    }
}

/// The result of diffing a proposed record set against the current store
/// contents. A given key appears in at most one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Records present in the new set but absent from the current store
    pub added: Vec<Record>,
    /// Records present in both but whose content differs
    pub updated: Vec<Record>,
    /// Keys present in the current store but absent from the new set
    pub deleted: Vec<RecordKey>,
}

impl ChangeSet {
    /// True when all three buckets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// The kind of a storage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEventKind {
    /// A record was created
    Added,
    /// A record was updated in place
    Updated,
    /// A record was removed
    Deleted,
    /// A hot or partial reload committed
    Reloaded,
}

/// An event published by Core Storage on every mutation.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    /// What kind of change occurred
    pub kind: StorageEventKind,
    /// The affected record, when applicable (absent for `Deleted` and `Reloaded`)
    pub record: Option<Record>,
    /// The affected key, when applicable (present for `Added`, `Updated`, `Deleted`)
    pub key: Option<RecordKey>,
    /// The store version after this event committed
    pub version: u64,
    /// Which adapter originated this event, if any; used to suppress
    /// feedback loops (an adapter never writes back an event it produced).
    pub source: Option<&'static str>,
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
