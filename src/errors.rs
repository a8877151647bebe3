// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the DNS server's core subsystems.
//!
//! Each subsystem gets its own `thiserror`-derived enum. A crate-wide [`Error`]
//! aggregates them so callers at a subsystem boundary can convert with `?` while
//! callers further up the stack can still match on the concrete kind.
//!
//! Every leaf error exposes [`Error::is_transient`] (retry-eligible vs. permanent)
//! and [`Error::status_reason`] (a short machine-readable tag for logs and the
//! certificate-status HTTP surface).

use thiserror::Error;

/// Errors raised by Core Storage.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// `Create` was called for a (name, kind) pair that already exists.
    #[error("record '{name}' ({kind}) already exists")]
    RecordExists {
        /// Fully qualified record name
        name: String,
        /// Record kind (A, AAAA, CNAME, ...)
        kind: String,
    },

    /// `Update`/`Delete` was called for a (name, kind) pair that does not exist.
    #[error("record '{name}' ({kind}) not found")]
    RecordNotFound {
        /// Fully qualified record name
        name: String,
        /// Record kind (A, AAAA, CNAME, ...)
        kind: String,
    },

    /// A record failed validation before being accepted by the store.
    #[error("invalid record '{name}': {reason}")]
    InvalidRecord {
        /// Fully qualified record name
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors raised while resolving a query through the DNS backend.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// No record satisfied the query after exact, wildcard, CNAME, and upstream lookups.
    #[error("no record found for '{name}' ({kind})")]
    NotFound {
        /// The queried name
        name: String,
        /// The queried kind
        kind: String,
    },

    /// All configured upstream servers failed (network error or timeout).
    #[error("all upstream servers failed for '{name}' ({kind}): {reason}")]
    UpstreamUnavailable {
        /// The queried name
        name: String,
        /// The queried kind
        kind: String,
        /// Aggregate failure reason
        reason: String,
    },

    /// The upstream server returned a response this server could not decode.
    #[error("malformed upstream response from {server}: {reason}")]
    UpstreamMalformedResponse {
        /// The upstream server address
        server: String,
        /// Decode failure detail
        reason: String,
    },
}

/// Errors raised by GeoIP lookups.
#[derive(Error, Debug, Clone)]
pub enum GeoIpError {
    /// The IP address is not present in the MMDB, or has no city/location data.
    #[error("no location found for {ip}")]
    NotFound {
        /// The address that could not be located
        ip: String,
    },

    /// The configured MMDB path could not be opened or parsed.
    #[error("failed to open MMDB at {path}: {reason}")]
    DatabaseUnavailable {
        /// The configured path
        path: String,
        /// Underlying error
        reason: String,
    },
}

/// Errors raised by the ACME / DNS-01 provider.
#[derive(Error, Debug, Clone)]
pub enum AcmeError {
    /// The configured ACME mode is missing or unrecognised.
    #[error("invalid ACME mode '{mode}'")]
    InvalidMode {
        /// The offending mode string
        mode: String,
    },

    /// ZeroSSL mode was selected but no EAB credentials were resolved.
    #[error("ZeroSSL requires external account binding credentials but none were configured")]
    MissingEab,

    /// Account registration with the CA failed.
    #[error("ACME account registration failed: {reason}")]
    AccountRegistrationFailed {
        /// CA-reported or transport reason
        reason: String,
    },

    /// One or more authorizations failed validation.
    #[error("authorization failed for domain '{domain}': {reason}")]
    AuthorizationFailed {
        /// The domain whose authorization failed
        domain: String,
        /// CA-reported reason
        reason: String,
    },

    /// The CA rate-limited this account.
    #[error("rate limited by CA: {reason}")]
    RateLimited {
        /// CA-reported reason
        reason: String,
    },

    /// DNS-01 challenge propagation did not complete within the poll window.
    #[error("challenge for '{domain}' did not propagate within {timeout_secs}s")]
    PropagationTimeout {
        /// The domain under challenge
        domain: String,
        /// How long we waited
        timeout_secs: u64,
    },

    /// Persisting the issued certificate to its Secret failed.
    #[error("failed to persist certificate secret '{secret_name}': {reason}")]
    SecretPersistFailed {
        /// The target Secret name
        secret_name: String,
        /// Underlying error
        reason: String,
    },
}

/// Errors raised by the domain↔secret-name mapping.
#[derive(Error, Debug, Clone)]
pub enum MappingError {
    /// The input domain is not well-formed.
    #[error("invalid domain '{domain}': {reason}")]
    InvalidDomain {
        /// The offending domain
        domain: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// The input secret name does not match either the normal or wildcard prefix scheme.
    #[error("invalid secret name '{name}': {reason}")]
    InvalidSecretName {
        /// The offending secret name
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Composite error type that encompasses all core-subsystem errors.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Core Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// DNS resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// GeoIP lookup error
    #[error(transparent)]
    GeoIp(#[from] GeoIpError),

    /// ACME provider error
    #[error(transparent)]
    Acme(#[from] AcmeError),

    /// Domain↔secret mapping error
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Transient I/O or network failure (adapters, upstream, K8s API)
    #[error("transient failure: {0}")]
    Transient(String),

    /// Unrecoverable configuration or startup failure
    #[error("fatal error: {0}")]
    Fatal(String),

    /// Generic error for situations that don't fit another category
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Returns true if this error is transient and the operation should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Resolve(ResolveError::UpstreamUnavailable { .. }) | Self::Transient(_) => true,
            Self::Acme(
                AcmeError::AccountRegistrationFailed { .. }
                | AcmeError::RateLimited { .. }
                | AcmeError::PropagationTimeout { .. }
                | AcmeError::SecretPersistFailed { .. },
            ) => true,
            Self::Storage(_)
            | Self::Resolve(_)
            | Self::GeoIp(_)
            | Self::Acme(
                AcmeError::InvalidMode { .. }
                | AcmeError::MissingEab
                | AcmeError::AuthorizationFailed { .. },
            )
            | Self::Mapping(_)
            | Self::Fatal(_)
            | Self::Generic(_) => false,
        }
    }

    /// Returns a short machine-readable status reason for logs and status surfaces.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Storage(StorageError::RecordExists { .. }) => "RecordExists",
            Self::Storage(StorageError::RecordNotFound { .. }) => "RecordNotFound",
            Self::Storage(StorageError::InvalidRecord { .. }) => "InvalidRecord",

            Self::Resolve(ResolveError::NotFound { .. }) => "ResolveNotFound",
            Self::Resolve(ResolveError::UpstreamUnavailable { .. }) => "UpstreamUnavailable",
            Self::Resolve(ResolveError::UpstreamMalformedResponse { .. }) => {
                "UpstreamMalformedResponse"
            }

            Self::GeoIp(GeoIpError::NotFound { .. }) => "GeoIpNotFound",
            Self::GeoIp(GeoIpError::DatabaseUnavailable { .. }) => "GeoIpDatabaseUnavailable",

            Self::Acme(AcmeError::InvalidMode { .. }) => "AcmeInvalidMode",
            Self::Acme(AcmeError::MissingEab) => "AcmeMissingEab",
            Self::Acme(AcmeError::AccountRegistrationFailed { .. }) => {
                "AcmeAccountRegistrationFailed"
            }
            Self::Acme(AcmeError::AuthorizationFailed { .. }) => "AcmeAuthorizationFailed",
            Self::Acme(AcmeError::RateLimited { .. }) => "AcmeRateLimited",
            Self::Acme(AcmeError::PropagationTimeout { .. }) => "AcmePropagationTimeout",
            Self::Acme(AcmeError::SecretPersistFailed { .. }) => "AcmeSecretPersistFailed",

            Self::Mapping(MappingError::InvalidDomain { .. }) => "InvalidDomain",
            Self::Mapping(MappingError::InvalidSecretName { .. }) => "InvalidSecretName",

            Self::Transient(_) => "Transient",
            Self::Fatal(_) => "Fatal",
            Self::Generic(_) => "Generic",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Generic(err.to_string())
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
