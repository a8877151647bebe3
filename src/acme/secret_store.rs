// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate persistence: a `CertStore` trait backed by Kubernetes
//! Secrets, with a read-only status projection computed on demand by
//! parsing the stored certificate's `NotAfter` date.
//!
//! Secret construction follows standard labels and deterministic naming
//! derived from the domain, applied with server-side apply under a fixed
//! field manager.

use crate::constants::{SECRET_KEY_ISSUER_CRT, SECRET_KEY_TLS_CRT, SECRET_KEY_TLS_KEY, TLS_SECRET_TYPE};
use crate::errors::{AcmeError, Error};
use crate::labels::{COMPONENT_ACME_SECRET, DOMAIN_ANNOTATION, K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME, MANAGED_BY_DNS_SERVER, RENEWED_AT_ANNOTATION};
use crate::mapping::{domain_to_secret, is_managed_secret_name, secret_to_domain};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ListParams, ObjectMeta, Patch, PatchParams};
use kube::Client;
use std::collections::BTreeMap;

const FIELD_MANAGER: &str = "korenet-dns";

/// A freshly issued certificate, ready to persist.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    /// PEM certificate chain
    pub cert_pem: String,
    /// PEM private key
    pub key_pem: String,
    /// PEM issuer chain
    pub issuer_pem: String,
}

/// A read-only projection of a persisted certificate's status, used by the
/// HTTP status route and the renewal ticker's logging.
#[derive(Debug, Clone)]
pub struct CertificateStatus {
    /// The domain this certificate was issued for
    pub domain: String,
    /// The Secret holding it
    pub secret_name: String,
    /// Certificate expiry
    pub not_after: DateTime<Utc>,
    /// Days remaining until expiry (may be negative if already expired)
    pub remaining_days: i64,
}

/// Persists and inspects ACME-issued certificates.
#[async_trait]
pub trait CertStore: Send + Sync {
    /// Persists `bundle` under the Secret mapped from `domain`.
    async fn persist(&self, domain: &str, bundle: CertificateBundle) -> Result<(), Error>;

    /// Reads the current certificate status for `domain`.
    async fn status(&self, domain: &str) -> Result<CertificateStatus, Error>;

    /// Lists the domains this server currently manages certificates for.
    async fn list_managed_domains(&self) -> Result<Vec<String>, Error>;
}

/// A [`CertStore`] backed by Kubernetes Secrets in a fixed namespace.
pub struct SecretCertStore {
    client: Client,
    namespace: String,
}

impl SecretCertStore {
    /// Builds a store operating on Secrets in `namespace`.
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn secrets_api(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl CertStore for SecretCertStore {
    async fn persist(&self, domain: &str, bundle: CertificateBundle) -> Result<(), Error> {
        let secret_name = domain_to_secret(domain)?;

        let mut labels = BTreeMap::new();
        labels.insert(K8S_NAME.to_string(), MANAGED_BY_DNS_SERVER.to_string());
        labels.insert(K8S_MANAGED_BY.to_string(), MANAGED_BY_DNS_SERVER.to_string());
        labels.insert(K8S_COMPONENT.to_string(), COMPONENT_ACME_SECRET.to_string());

        let mut annotations = BTreeMap::new();
        annotations.insert(DOMAIN_ANNOTATION.to_string(), domain.to_string());
        annotations.insert(RENEWED_AT_ANNOTATION.to_string(), Utc::now().to_rfc3339());

        let mut data = BTreeMap::new();
        data.insert(SECRET_KEY_TLS_CRT.to_string(), ByteString(bundle.cert_pem.into_bytes()));
        data.insert(SECRET_KEY_TLS_KEY.to_string(), ByteString(bundle.key_pem.into_bytes()));
        data.insert(SECRET_KEY_ISSUER_CRT.to_string(), ByteString(bundle.issuer_pem.into_bytes()));

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(secret_name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                annotations: Some(annotations),
                ..Default::default()
            },
            type_: Some(TLS_SECRET_TYPE.to_string()),
            data: Some(data),
            ..Default::default()
        };

        self.secrets_api()
            .patch(&secret_name, &PatchParams::apply(FIELD_MANAGER).force(), &Patch::Apply(&secret))
            .await
            .map_err(|err| AcmeError::SecretPersistFailed {
                secret_name,
                reason: err.to_string(),
            })?;
        Ok(())
    }

    async fn status(&self, domain: &str) -> Result<CertificateStatus, Error> {
        let secret_name = domain_to_secret(domain)?;
        let secret = self
            .secrets_api()
            .get(&secret_name)
            .await
            .map_err(|err| Error::Transient(format!("failed to fetch secret '{secret_name}': {err}")))?;

        let cert_pem = secret
            .data
            .as_ref()
            .and_then(|d| d.get(SECRET_KEY_TLS_CRT))
            .ok_or_else(|| Error::Fatal(format!("secret '{secret_name}' missing '{SECRET_KEY_TLS_CRT}'")))?;

        let not_after = parse_not_after(&cert_pem.0)?;
        let remaining_days = (not_after - Utc::now()).num_days();

        Ok(CertificateStatus {
            domain: domain.to_string(),
            secret_name,
            not_after,
            remaining_days,
        })
    }

    async fn list_managed_domains(&self) -> Result<Vec<String>, Error> {
        let list = self
            .secrets_api()
            .list(&ListParams::default().labels(&format!("{K8S_COMPONENT}={COMPONENT_ACME_SECRET}")))
            .await
            .map_err(|err| Error::Transient(format!("failed to list certificate secrets: {err}")))?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|secret| secret.metadata.name)
            .filter(|name| is_managed_secret_name(name))
            .filter_map(|name| secret_to_domain(&name).ok())
            .collect())
    }
}

/// Parses the `NotAfter` date out of a PEM certificate chain's leaf certificate.
///
/// # Errors
/// Returns [`Error::Fatal`] if the PEM does not parse as a valid X.509 certificate.
pub fn parse_not_after(cert_pem: &[u8]) -> Result<DateTime<Utc>, Error> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem)
        .map_err(|err| Error::Fatal(format!("failed to parse certificate PEM: {err}")))?;
    let cert = pem
        .parse_x509()
        .map_err(|err| Error::Fatal(format!("failed to parse certificate: {err}")))?;

    let timestamp = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0).ok_or_else(|| Error::Fatal("certificate NotAfter out of range".to_string()))
}

#[cfg(test)]
#[path = "secret_store_tests.rs"]
mod secret_store_tests;
