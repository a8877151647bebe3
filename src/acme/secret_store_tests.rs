// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn parse_not_after_rejects_non_pem_input() {
    let err = parse_not_after(b"this is not a certificate").unwrap_err();
    assert!(matches!(err, Error::Fatal(_)));
}

#[test]
fn parse_not_after_rejects_truncated_pem_header() {
    let err = parse_not_after(b"-----BEGIN CERTIFICATE-----\nbm90IHJlYWwgZGVy\n-----END CERTIFICATE-----\n").unwrap_err();
    assert!(matches!(err, Error::Fatal(_)));
}
