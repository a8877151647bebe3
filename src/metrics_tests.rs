// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn record_query_increments_counter_and_histogram() {
    record_query("A", "authoritative", "udp", Duration::from_millis(2));

    let counter = QUERIES_TOTAL.with_label_values(&["A", "authoritative"]);
    assert!(counter.get() > 0.0);

    let histogram = QUERY_DURATION_SECONDS.with_label_values(&["udp"]);
    assert!(histogram.get_sample_count() > 0);
}

#[test]
fn record_storage_reload_sets_version_gauge() {
    record_storage_reload("file", 7);
    let gauge = STORAGE_VERSION.with_label_values(&["default"]);
    assert_eq!(gauge.get(), 7.0);
}

#[test]
fn set_storage_record_count_updates_gauge() {
    set_storage_record_count("AAAA", 42);
    let gauge = STORAGE_RECORDS.with_label_values(&["AAAA"]);
    assert_eq!(gauge.get(), 42.0);
}

#[test]
fn record_acme_issuance_tracks_success_and_failure_separately() {
    record_acme_issuance("api.example.com", true);
    record_acme_issuance("api.example.com", false);

    assert!(ACME_ISSUANCE_TOTAL.with_label_values(&["api.example.com", "success"]).get() > 0.0);
    assert!(ACME_ISSUANCE_TOTAL.with_label_values(&["api.example.com", "failure"]).get() > 0.0);
}

#[test]
fn gather_metrics_includes_namespace_and_registered_series() {
    record_query("MX", "forwarded", "tcp", Duration::from_millis(5));

    let text = gather_metrics().expect("gathering metrics should succeed");
    assert!(text.contains("korenet_dns_queries_total"));
}
