// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bijective mapping between a domain name and the Kubernetes Secret name
//! that holds its issued certificate.
//!
//! For a domain `d`:
//! - wildcard (`d` begins with `*.`): secret name = `tls-wildcard--` followed
//!   by `d` with its leading `*.` replaced by `__` and every remaining `.`
//!   replaced by `_` (`-` passes through unchanged).
//! - normal: secret name = `tls-normal--` followed by `d` with every `.`
//!   replaced by `_` (`-` passes through unchanged).
//!
//! `_` never occurs in a valid domain name, so the transform is exactly
//! invertible: `secret_to_domain` reverses the substitution byte-for-byte.

use crate::errors::{Error, MappingError};

const NORMAL_PREFIX: &str = "tls-normal--";
const WILDCARD_PREFIX: &str = "tls-wildcard--";
const MAX_SECRET_NAME_LEN: usize = 253;

/// Converts a domain name into its certificate Secret name.
///
/// # Errors
/// Returns [`MappingError::InvalidDomain`] if `domain` is empty, contains a
/// wildcard label anywhere but as the first label, contains an underscore
/// (which would make the encoding irreversible), or produces a Secret name
/// exceeding the Kubernetes name length limit.
pub fn domain_to_secret(domain: &str) -> Result<String, Error> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(MappingError::InvalidDomain {
            domain,
            reason: "domain is empty".into(),
        }
        .into());
    }
    if domain.contains('_') {
        return Err(MappingError::InvalidDomain {
            domain,
            reason: "domain must not contain '_'".into(),
        }
        .into());
    }

    let is_wildcard = domain.starts_with("*.");
    if is_wildcard {
        if domain[2..].contains('*') {
            return Err(MappingError::InvalidDomain {
                domain,
                reason: "multiple wildcard labels".into(),
            }
            .into());
        }
    } else if domain.contains('*') {
        return Err(MappingError::InvalidDomain {
            domain,
            reason: "wildcard label must be the leftmost label".into(),
        }
        .into());
    }

    let (prefix, encoded) = if is_wildcard {
        (WILDCARD_PREFIX, format!("__{}", domain[2..].replace('.', "_")))
    } else {
        (NORMAL_PREFIX, domain.replace('.', "_"))
    };

    let name = format!("{prefix}{encoded}");
    if name.len() > MAX_SECRET_NAME_LEN {
        return Err(MappingError::InvalidDomain {
            domain,
            reason: format!("encoded secret name exceeds {MAX_SECRET_NAME_LEN} characters"),
        }
        .into());
    }

    Ok(name)
}

/// Converts a certificate Secret name back into the domain it was derived from.
///
/// # Errors
/// Returns [`MappingError::InvalidSecretName`] if `name` carries neither the
/// normal nor the wildcard prefix, or the wildcard body is missing its `__`
/// marker.
pub fn secret_to_domain(name: &str) -> Result<String, Error> {
    if let Some(rest) = name.strip_prefix(WILDCARD_PREFIX) {
        let Some(body) = rest.strip_prefix("__") else {
            return Err(MappingError::InvalidSecretName {
                name: name.to_string(),
                reason: "wildcard secret name missing '__' marker".into(),
            }
            .into());
        };
        return Ok(format!("*.{}", body.replace('_', ".")));
    }
    if let Some(rest) = name.strip_prefix(NORMAL_PREFIX) {
        return Ok(rest.replace('_', "."));
    }
    Err(MappingError::InvalidSecretName {
        name: name.to_string(),
        reason: format!("name carries neither the '{NORMAL_PREFIX}' nor '{WILDCARD_PREFIX}' prefix"),
    }
    .into())
}

/// Validates that `name` is a well-formed Kubernetes Secret name produced by
/// [`domain_to_secret`]. Used by the Secret watcher to ignore unrelated Secrets.
#[must_use]
pub fn is_managed_secret_name(name: &str) -> bool {
    name.starts_with(NORMAL_PREFIX) || name.starts_with(WILDCARD_PREFIX)
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod mapping_tests;
