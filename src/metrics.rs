// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the DNS server.
//!
//! All metrics use the namespace prefix `korenet_dns_`. Exposed on the HTTP
//! surface's `/metrics` route in Prometheus text format.
//!
//! # Categories
//!
//! - **Query Metrics** - queries served, by record kind and outcome
//! - **Storage Metrics** - reload count and current record-store version
//! - **ACME Metrics** - issuance attempts, successes, and failures

use prometheus::{CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "korenet_dns";

/// Global Prometheus metrics registry, gathered by the `/metrics` HTTP route.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Query Metrics
// ============================================================================

/// Total queries served, by record kind and outcome.
///
/// Labels:
/// - `kind`: queried record type (`A`, `AAAA`, `CNAME`, ...)
/// - `outcome`: `authoritative`, `forwarded`, `nxdomain`, `servfail`
pub static QUERIES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_queries_total"), "Total DNS queries served by kind and outcome");
    let counter = CounterVec::new(opts, &["kind", "outcome"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Query handling latency in seconds, by transport.
///
/// Labels:
/// - `transport`: `udp` or `tcp`
pub static QUERY_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_query_duration_seconds"),
        "DNS query handling latency in seconds by transport",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]);
    let histogram = HistogramVec::new(opts, &["transport"]).unwrap();
    METRICS_REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

// ============================================================================
// Storage Metrics
// ============================================================================

/// Total number of full or partial reloads applied to the record store.
///
/// Labels:
/// - `source`: the adapter that triggered the reload (`configmap`, `file`, or `api`)
pub static STORAGE_RELOADS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_storage_reloads_total"), "Total record store reloads by source");
    let counter = CounterVec::new(opts, &["source"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Current record store version (monotonically increasing per applied change).
pub static STORAGE_VERSION: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_storage_version"), "Current record store version");
    let gauge = GaugeVec::new(opts, &["store"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Current number of records held in the store, by kind.
pub static STORAGE_RECORDS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_storage_records"), "Current record count by kind");
    let gauge = GaugeVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// ACME Metrics
// ============================================================================

/// Total ACME issuance/renewal attempts, by outcome.
///
/// Labels:
/// - `domain`: the primary domain requested
/// - `outcome`: `success` or `failure`
pub static ACME_ISSUANCE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_acme_issuance_total"),
        "Total ACME certificate issuance attempts by domain and outcome",
    );
    let counter = CounterVec::new(opts, &["domain", "outcome"]).unwrap();
    METRICS_REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Remaining validity, in days, of the most recently observed certificate per domain.
pub static ACME_CERTIFICATE_REMAINING_DAYS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_acme_certificate_remaining_days"),
        "Remaining validity in days of the managed certificate for a domain",
    );
    let gauge = GaugeVec::new(opts, &["domain"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Records a served query outcome and its handling latency.
pub fn record_query(kind: &str, outcome: &str, transport: &str, duration: Duration) {
    QUERIES_TOTAL.with_label_values(&[kind, outcome]).inc();
    QUERY_DURATION_SECONDS.with_label_values(&[transport]).observe(duration.as_secs_f64());
}

/// Records that the record store was reloaded by `source` and is now at `version`.
pub fn record_storage_reload(source: &str, version: u64) {
    STORAGE_RELOADS_TOTAL.with_label_values(&[source]).inc();
    STORAGE_VERSION.with_label_values(&["default"]).set(version as f64);
}

/// Updates the current record count gauge for `kind`.
pub fn set_storage_record_count(kind: &str, count: usize) {
    STORAGE_RECORDS.with_label_values(&[kind]).set(count as f64);
}

/// Records an ACME issuance/renewal attempt outcome.
pub fn record_acme_issuance(domain: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    ACME_ISSUANCE_TOTAL.with_label_values(&[domain, outcome]).inc();
}

/// Updates the remaining-validity gauge for a domain's certificate.
pub fn set_acme_certificate_remaining_days(domain: &str, remaining_days: i64) {
    ACME_CERTIFICATE_REMAINING_DAYS.with_label_values(&[domain]).set(remaining_days as f64);
}

/// Gathers and encodes all metrics in Prometheus text format.
///
/// # Errors
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
