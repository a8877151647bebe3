// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use crate::geoip::MockLookup;
use crate::record::{Record, RecordKind};

fn coord(latitude: f64, longitude: f64) -> Coordinates {
    Coordinates { latitude, longitude }
}

#[test]
fn haversine_is_zero_for_identical_points() {
    let p = coord(43.65, -79.38);
    assert_eq!(haversine_km(p, p), 0.0);
}

#[test]
fn haversine_is_symmetric() {
    let toronto = coord(43.65, -79.38);
    let london = coord(51.51, -0.13);
    assert!((haversine_km(toronto, london) - haversine_km(london, toronto)).abs() < 1e-9);
}

#[test]
fn haversine_matches_known_distance_toronto_london() {
    let toronto = coord(43.6532, -79.3832);
    let london = coord(51.5074, -0.1278);
    let km = haversine_km(toronto, london);
    assert!((5600.0..5900.0).contains(&km), "got {km}");
}

#[tokio::test]
async fn sort_orders_ascending_by_distance_from_client() {
    let toronto_ip: IpAddr = "10.0.0.1".parse().unwrap();
    let london_ip: IpAddr = "10.0.0.2".parse().unwrap();
    let tokyo_ip: IpAddr = "10.0.0.3".parse().unwrap();

    let mut lookup = MockLookup::default();
    lookup.insert(toronto_ip, coord(43.6532, -79.3832));
    lookup.insert(london_ip, coord(51.5074, -0.1278));
    lookup.insert(tokyo_ip, coord(35.6762, 139.6503));

    let new_york = coord(40.7128, -74.0060);
    let record = Record::new(
        "geo.example.com.",
        RecordKind::A,
        300,
        vec!["10.0.0.3".into(), "10.0.0.2".into(), "10.0.0.1".into()],
    );

    let sorted = sort_records_by_distance(record, new_york, &lookup).await;
    assert_eq!(sorted.value, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
}

#[tokio::test]
async fn unparseable_and_unlocatable_values_sort_last_and_keep_relative_order() {
    let known_ip: IpAddr = "10.0.0.1".parse().unwrap();
    let mut lookup = MockLookup::default();
    lookup.insert(known_ip, coord(43.6532, -79.3832));

    let client = coord(40.7128, -74.0060);
    let record = Record::new(
        "geo.example.com.",
        RecordKind::A,
        300,
        vec!["not-an-ip".into(), "10.0.0.1".into(), "10.0.0.99".into()],
    );

    let sorted = sort_records_by_distance(record, client, &lookup).await;
    assert_eq!(sorted.value[0], "10.0.0.1");
    assert_eq!(sorted.value[1], "not-an-ip");
    assert_eq!(sorted.value[2], "10.0.0.99");
}

#[tokio::test]
async fn records_with_fewer_than_two_values_are_unchanged() {
    let lookup = MockLookup::default();
    let client = coord(0.0, 0.0);
    let record = Record::new("single.example.com.", RecordKind::A, 300, vec!["10.0.0.1".into()]);

    let sorted = sort_records_by_distance(record.clone(), client, &lookup).await;
    assert_eq!(sorted, record);
}

#[tokio::test]
async fn non_address_records_are_unchanged() {
    let lookup = MockLookup::default();
    let client = coord(0.0, 0.0);
    let record = Record::new(
        "txt.example.com.",
        RecordKind::Txt,
        300,
        vec!["first".into(), "second".into()],
    );

    let sorted = sort_records_by_distance(record.clone(), client, &lookup).await;
    assert_eq!(sorted, record);
}

#[tokio::test]
async fn all_unlocatable_values_preserve_input_order() {
    let lookup = MockLookup::default();
    let client = coord(0.0, 0.0);
    let record = Record::new(
        "geo.example.com.",
        RecordKind::A,
        300,
        vec!["10.0.0.3".into(), "10.0.0.2".into(), "10.0.0.1".into()],
    );

    let sorted = sort_records_by_distance(record.clone(), client, &lookup).await;
    assert_eq!(sorted.value, record.value);
}
