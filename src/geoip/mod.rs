// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! GeoIP-aware answer ordering.
//!
//! [`IpLookup`] abstracts the coordinate source so the resolution pipeline
//! can run against a MaxMind city database in production and an in-memory
//! fixture in tests.

mod distance;

pub use distance::{haversine_km, sort_records_by_distance, Coordinates};

use crate::errors::{Error, GeoIpError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

/// Resolves an IP address to geographic coordinates.
#[async_trait]
pub trait IpLookup: Send + Sync {
    /// Looks up the coordinates for `ip`.
    ///
    /// # Errors
    /// Returns [`GeoIpError::NotFound`] if the address has no location data.
    async fn lookup(&self, ip: IpAddr) -> Result<Coordinates, Error>;
}

/// A [`IpLookup`] backed by a MaxMind GeoLite2/GeoIP2 City database.
pub struct MaxMindLookup {
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindLookup {
    /// Opens the MMDB file at `path`.
    ///
    /// # Errors
    /// Returns [`GeoIpError::DatabaseUnavailable`] if the file cannot be
    /// opened or does not parse as a valid MMDB.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let reader = maxminddb::Reader::open_readfile(path).map_err(|err| GeoIpError::DatabaseUnavailable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self { reader })
    }
}

#[async_trait]
impl IpLookup for MaxMindLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<Coordinates, Error> {
        let city: maxminddb::geoip2::City = self.reader.lookup(ip).map_err(|_| GeoIpError::NotFound {
            ip: ip.to_string(),
        })?;
        let location = city.location.ok_or_else(|| GeoIpError::NotFound { ip: ip.to_string() })?;
        let (Some(latitude), Some(longitude)) = (location.latitude, location.longitude) else {
            return Err(GeoIpError::NotFound { ip: ip.to_string() }.into());
        };
        Ok(Coordinates { latitude, longitude })
    }
}

/// An in-memory [`IpLookup`] fixture for tests: a fixed table of IP → coordinates.
#[derive(Debug, Clone, Default)]
pub struct MockLookup {
    table: HashMap<IpAddr, Coordinates>,
}

impl MockLookup {
    /// Builds a mock lookup from an explicit table.
    #[must_use]
    pub fn new(table: HashMap<IpAddr, Coordinates>) -> Self {
        Self { table }
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, ip: IpAddr, coordinates: Coordinates) {
        self.table.insert(ip, coordinates);
    }
}

#[async_trait]
impl IpLookup for MockLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<Coordinates, Error> {
        self.table
            .get(&ip)
            .copied()
            .ok_or_else(|| GeoIpError::NotFound { ip: ip.to_string() }.into())
    }
}
