// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn storage_errors_are_not_transient() {
    let err = Error::Storage(StorageError::RecordNotFound {
        name: "example.com.".into(),
        kind: "A".into(),
    });
    assert!(!err.is_transient());
    assert_eq!(err.status_reason(), "RecordNotFound");
}

#[test]
fn upstream_unavailable_is_transient() {
    let err = Error::Resolve(ResolveError::UpstreamUnavailable {
        name: "example.com.".into(),
        kind: "A".into(),
        reason: "timeout".into(),
    });
    assert!(err.is_transient());
    assert_eq!(err.status_reason(), "UpstreamUnavailable");
}

#[test]
fn acme_rate_limited_is_transient() {
    let err = Error::Acme(AcmeError::RateLimited {
        reason: "too many requests".into(),
    });
    assert!(err.is_transient());
}

#[test]
fn acme_missing_eab_is_not_transient() {
    let err = Error::Acme(AcmeError::MissingEab);
    assert!(!err.is_transient());
    assert_eq!(err.status_reason(), "AcmeMissingEab");
}

#[test]
fn generic_from_anyhow_preserves_message() {
    let anyhow_err = anyhow::anyhow!("boom");
    let err: Error = anyhow_err.into();
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn transparent_display_delegates_to_inner() {
    let err = Error::Mapping(MappingError::InvalidDomain {
        domain: "*.*.com".into(),
        reason: "multiple wildcard labels".into(),
    });
    assert!(err.to_string().contains("*.*.com"));
}
