// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::IpLookup;
use crate::constants::EARTH_RADIUS_KM;
use crate::record::{Record, RecordKind};
use std::net::IpAddr;

/// A point on Earth's surface, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Great-circle distance between two points, in kilometres, using the
/// Haversine formula and a mean Earth radius of 6371.0 km.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Stably reorders the values of an A/AAAA record ascending by distance from
/// `client`. Values that fail to parse as an IP address, or that the lookup
/// cannot locate, sort last (treated as `+inf` distance) and otherwise keep
/// their relative order.
///
/// Records with fewer than two values, or of a kind other than A/AAAA, are
/// returned unchanged.
pub async fn sort_records_by_distance(
    mut record: Record,
    client: Coordinates,
    lookup: &dyn IpLookup,
) -> Record {
    if !record.kind.is_address() || record.value.len() < 2 {
        return record;
    }

    let mut keyed: Vec<(f64, String)> = Vec::with_capacity(record.value.len());
    for value in record.value.drain(..) {
        let distance = match value.parse::<IpAddr>() {
            Ok(ip) => match lookup.lookup(ip).await {
                Ok(coords) => haversine_km(client, coords),
                Err(_) => f64::INFINITY,
            },
            Err(_) => f64::INFINITY,
        };
        keyed.push((distance, value));
    }

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    record.value = keyed.into_iter().map(|(_, v)| v).collect();
    record
}

#[cfg(test)]
#[path = "distance_tests.rs"]
mod distance_tests;
