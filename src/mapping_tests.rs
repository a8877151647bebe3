// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn wildcard_domain_matches_literal_example() {
    assert_eq!(domain_to_secret("*.api.example.com").unwrap(), "tls-wildcard--__api_example_com");
}

#[test]
fn normal_secret_matches_literal_example() {
    assert_eq!(secret_to_domain("tls-normal--my-api_example_com").unwrap(), "my-api.example.com");
}

#[test]
fn normal_domain_round_trips() {
    let secret = domain_to_secret("example.com").unwrap();
    assert_eq!(secret, "tls-normal--example_com");
    assert_eq!(secret_to_domain(&secret).unwrap(), "example.com");
}

#[test]
fn wildcard_domain_round_trips() {
    let secret = domain_to_secret("*.example.com").unwrap();
    assert_eq!(secret, "tls-wildcard--__example_com");
    assert_eq!(secret_to_domain(&secret).unwrap(), "*.example.com");
}

#[test]
fn subdomain_round_trips() {
    let secret = domain_to_secret("api.staging.example.com").unwrap();
    assert_eq!(secret_to_domain(&secret).unwrap(), "api.staging.example.com");
}

#[test]
fn hyphenated_label_passes_through_unchanged() {
    let secret = domain_to_secret("my-api.example.com").unwrap();
    assert_eq!(secret, "tls-normal--my-api_example_com");
    assert_eq!(secret_to_domain(&secret).unwrap(), "my-api.example.com");
}

#[test]
fn trailing_dot_is_ignored() {
    assert_eq!(domain_to_secret("example.com.").unwrap(), domain_to_secret("example.com").unwrap());
}

#[test]
fn uppercase_domain_is_lowercased() {
    assert_eq!(domain_to_secret("Example.COM").unwrap(), "tls-normal--example_com");
}

#[test]
fn empty_domain_is_rejected() {
    assert!(domain_to_secret("").is_err());
    assert!(domain_to_secret(".").is_err());
}

#[test]
fn underscore_in_domain_is_rejected() {
    assert!(domain_to_secret("weird_domain.example.com").is_err());
}

#[test]
fn non_leftmost_wildcard_is_rejected() {
    assert!(domain_to_secret("foo.*.example.com").is_err());
}

#[test]
fn double_wildcard_is_rejected() {
    assert!(domain_to_secret("*.*.example.com").is_err());
}

#[test]
fn secret_to_domain_rejects_unknown_prefix() {
    assert!(secret_to_domain("random-secret-name").is_err());
}

#[test]
fn secret_to_domain_rejects_malformed_wildcard_body() {
    assert!(secret_to_domain("tls-wildcard--example_com").is_err());
}

#[test]
fn is_managed_secret_name_recognises_both_prefixes() {
    assert!(is_managed_secret_name("tls-normal--example_com"));
    assert!(is_managed_secret_name("tls-wildcard--__example_com"));
    assert!(!is_managed_secret_name("other-secret"));
}
