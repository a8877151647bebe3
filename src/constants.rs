// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the DNS server.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries
pub const DNS_PORT: u16 = 53;

/// Default TTL applied when a record's stored TTL is zero (5 minutes)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 300;

/// Maximum CNAME chain length followed during resolution
pub const MAX_CNAME_CHAIN_DEPTH: usize = 10;

/// TTL used for ACME DNS-01 challenge TXT records
pub const ACME_CHALLENGE_TTL_SECS: u32 = 60;

/// Default per-server upstream forwarding timeout
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;

/// Default upstream server list when forwarding is enabled but unconfigured
pub const DEFAULT_UPSTREAM_SERVERS: &[&str] = &["1.1.1.1:53"];

/// Maximum UDP message size before truncation (bytes)
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// Maximum message size accepted over TCP (bytes)
pub const MAX_TCP_MESSAGE_SIZE: usize = 65535;

// ============================================================================
// Storage / Watch Constants
// ============================================================================

/// Bounded capacity of each storage watch subscriber's event channel
pub const WATCH_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// GeoIP Constants
// ============================================================================

/// Mean Earth radius in kilometres, used by the Haversine distance calculation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// ============================================================================
// ACME Constants
// ============================================================================

/// Default certificate renewal threshold: reissue when remaining validity drops below this
pub const DEFAULT_RENEWAL_THRESHOLD_DAYS: i64 = 30;

/// Let's Encrypt production ACME directory URL
pub const LETSENCRYPT_DIRECTORY_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// ZeroSSL DV90 ACME directory URL
pub const ZEROSSL_DIRECTORY_URL: &str = "https://acme.zerossl.com/v2/DV90";

/// Maximum time to poll for DNS-01 challenge propagation before giving up
pub const ACME_PROPAGATION_TIMEOUT_SECS: u64 = 120;

/// Interval between propagation polls
pub const ACME_PROPAGATION_POLL_INTERVAL_SECS: u64 = 3;

/// Standard Kubernetes TLS secret type
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Secret data key holding the certificate chain
pub const SECRET_KEY_TLS_CRT: &str = "tls.crt";

/// Secret data key holding the private key
pub const SECRET_KEY_TLS_KEY: &str = "tls.key";

/// Secret data key holding the issuer chain
pub const SECRET_KEY_ISSUER_CRT: &str = "issuer.crt";

// ============================================================================
// Retry / Backoff Constants
// ============================================================================

/// Initial backoff delay for adapter and ACME retries
pub const INITIAL_BACKOFF_SECS: u64 = 1;

/// Maximum backoff delay cap
pub const MAX_BACKOFF_SECS: u64 = 60;

/// Requeue delay for a failed renewal tick (retried on the next tick)
pub const RENEWAL_RETRY_DELAY_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Graceful shutdown grace period for in-flight handlers
pub const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 10;

// ============================================================================
// Metrics / HTTP Server Constants
// ============================================================================

/// Default bind address for the HTTP management server
pub const HTTP_SERVER_BIND_ADDRESS: &str = "0.0.0.0:9153";

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness/healthz endpoint
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for the certificate status endpoint
pub const CERT_STATUS_PATH: &str = "/certs";
