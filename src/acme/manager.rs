// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Account registration, DNS-01 issuance, and the renewal ticker.
//!
//! Built on `instant-acme`, an async, tokio-native ACME client, alongside
//! `rcgen` for key and CSR generation.

use crate::constants::{
    ACME_CHALLENGE_TTL_SECS, ACME_PROPAGATION_POLL_INTERVAL_SECS, ACME_PROPAGATION_TIMEOUT_SECS,
    DEFAULT_RENEWAL_THRESHOLD_DAYS, LETSENCRYPT_DIRECTORY_URL, RENEWAL_RETRY_DELAY_SECS, ZEROSSL_DIRECTORY_URL,
};
use crate::errors::{AcmeError, Error};
use crate::metrics;
use crate::record::{Record, RecordKind};
use crate::storage::Storage;
use instant_acme::{
    Account, AuthorizationStatus, ChallengeType, ExternalAccountKey, Identifier, NewAccount, NewOrder, OrderStatus,
};
use rcgen::{Certificate, CertificateParams, DistinguishedName};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::secret_store::{CertStore, CertificateBundle};

/// Which CA directory to register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcmeMode {
    /// Let's Encrypt production directory
    LetsEncrypt,
    /// ZeroSSL DV90 directory (requires external account binding)
    ZeroSsl,
}

impl AcmeMode {
    /// Parses a configuration mode string.
    ///
    /// # Errors
    /// Returns [`AcmeError::InvalidMode`] for anything other than
    /// `"letsencrypt"` or `"zerossl"`.
    pub fn parse(mode: &str) -> Result<Self, Error> {
        match mode {
            "letsencrypt" => Ok(Self::LetsEncrypt),
            "zerossl" => Ok(Self::ZeroSsl),
            other => Err(AcmeError::InvalidMode { mode: other.to_string() }.into()),
        }
    }

    /// The ACME directory URL for this mode, unless overridden in configuration.
    #[must_use]
    pub fn directory_url(self) -> &'static str {
        match self {
            Self::LetsEncrypt => LETSENCRYPT_DIRECTORY_URL,
            Self::ZeroSsl => ZEROSSL_DIRECTORY_URL,
        }
    }

    /// True if this mode requires external account binding.
    #[must_use]
    pub fn requires_eab(self) -> bool {
        matches!(self, Self::ZeroSsl)
    }
}

/// External account binding credentials, resolved from environment
/// variables at process start (never stored in configuration files).
#[derive(Debug, Clone)]
pub struct EabCredentials {
    /// Key identifier issued by the CA
    pub kid: String,
    /// Base64url-encoded HMAC key issued by the CA
    pub hmac_key: String,
}

/// A domain (and optional additional SANs) to request a certificate for.
/// All SANs share the primary domain's Secret.
#[derive(Debug, Clone)]
pub struct IssuanceRequest {
    /// The primary domain; determines the target Secret name
    pub primary_domain: String,
    /// Additional Subject Alternative Names, if any
    pub additional_sans: Vec<String>,
}

impl IssuanceRequest {
    /// All domains covered by this request, primary first.
    #[must_use]
    pub fn all_domains(&self) -> Vec<String> {
        let mut domains = vec![self.primary_domain.clone()];
        domains.extend(self.additional_sans.iter().cloned());
        domains
    }
}

/// Orchestrates ACME account registration, DNS-01 issuance, and renewal.
pub struct AcmeManager {
    account: Account,
    storage: Arc<dyn Storage>,
    cert_store: Arc<dyn CertStore>,
    renewal_threshold_days: i64,
}

impl AcmeManager {
    /// Registers (or re-authenticates) an ACME account for `mode`.
    ///
    /// # Errors
    /// Returns [`AcmeError::MissingEab`] if `mode` requires EAB and none was
    /// supplied, or [`AcmeError::AccountRegistrationFailed`] if the CA
    /// rejects registration.
    pub async fn register(
        mode: AcmeMode,
        server_override: Option<&str>,
        email: &str,
        eab: Option<EabCredentials>,
        storage: Arc<dyn Storage>,
        cert_store: Arc<dyn CertStore>,
    ) -> Result<Self, Error> {
        if mode.requires_eab() && eab.is_none() {
            return Err(AcmeError::MissingEab.into());
        }

        let directory_url = server_override.unwrap_or_else(|| mode.directory_url());
        let external_account = eab
            .map(|creds| ExternalAccountKey::new(creds.kid, creds.hmac_key.as_bytes()))
            .transpose()
            .map_err(|err| AcmeError::AccountRegistrationFailed { reason: err.to_string() })?;

        let contact = format!("mailto:{email}");
        let (account, _credentials) = Account::create(
            &NewAccount {
                contact: &[&contact],
                terms_of_service_agreed: true,
                only_return_existing: false,
            },
            directory_url,
            external_account.as_ref(),
        )
        .await
        .map_err(|err| AcmeError::AccountRegistrationFailed { reason: err.to_string() })?;

        Ok(Self {
            account,
            storage,
            cert_store,
            renewal_threshold_days: DEFAULT_RENEWAL_THRESHOLD_DAYS,
        })
    }

    /// Runs the full DNS-01 issuance flow for `request`: presents and
    /// validates a TXT challenge per domain, finalizes the order, and
    /// persists the resulting certificate.
    ///
    /// # Errors
    /// Returns [`AcmeError::AuthorizationFailed`] if any authorization is
    /// rejected, or [`AcmeError::PropagationTimeout`] if a challenge never
    /// becomes ready within the poll window. On any failure the Secret is
    /// left untouched — partial success across SANs aborts the whole issuance.
    pub async fn issue(&self, request: &IssuanceRequest) -> Result<(), Error> {
        let domains = request.all_domains();
        let identifiers: Vec<Identifier> = domains.iter().cloned().map(Identifier::Dns).collect();

        let mut order = self
            .account
            .new_order(&NewOrder { identifiers: &identifiers })
            .await
            .map_err(|err| AcmeError::AuthorizationFailed {
                domain: request.primary_domain.clone(),
                reason: err.to_string(),
            })?;

        let authorizations = order
            .authorizations()
            .await
            .map_err(|err| AcmeError::AuthorizationFailed {
                domain: request.primary_domain.clone(),
                reason: err.to_string(),
            })?;

        let mut presented_challenges = Vec::new();
        for authz in &authorizations {
            if authz.status == AuthorizationStatus::Valid {
                continue;
            }

            let Identifier::Dns(domain) = &authz.identifier;
            let challenge = authz
                .challenges
                .iter()
                .find(|c| c.r#type == ChallengeType::Dns01)
                .ok_or_else(|| AcmeError::AuthorizationFailed {
                    domain: domain.clone(),
                    reason: "no dns-01 challenge offered".into(),
                })?;

            let dns_value = order.key_authorization(challenge).dns_value();
            let challenge_name = challenge_record_name(domain);
            self.present_challenge(&challenge_name, &dns_value).await?;
            presented_challenges.push((challenge_name, challenge.url.clone()));

            order
                .set_challenge_ready(&challenge.url)
                .await
                .map_err(|err| AcmeError::AuthorizationFailed {
                    domain: domain.clone(),
                    reason: err.to_string(),
                })?;
        }

        let poll_result = self.poll_order_ready(&mut order).await;

        // Always clean up presented challenge records, regardless of outcome.
        for (challenge_name, _) in &presented_challenges {
            self.cleanup_challenge(challenge_name).await;
        }

        poll_result?;

        let (cert_chain_pem, key_pem) = self.finalize_order(&mut order, &domains).await?;

        self.cert_store
            .persist(
                &request.primary_domain,
                CertificateBundle {
                    cert_pem: cert_chain_pem,
                    key_pem,
                    issuer_pem: String::new(),
                },
            )
            .await?;

        metrics::record_acme_issuance(&request.primary_domain, true);
        Ok(())
    }

    async fn present_challenge(&self, challenge_name: &str, dns_value: &str) -> Result<(), Error> {
        let record = Record::new(challenge_name, RecordKind::Txt, ACME_CHALLENGE_TTL_SECS, vec![dns_value.to_string()]);
        match self.storage.create(record.clone()).await {
            Ok(()) => Ok(()),
            Err(Error::Storage(crate::errors::StorageError::RecordExists { .. })) => self.storage.update(record).await,
            Err(err) => Err(err),
        }
    }

    async fn cleanup_challenge(&self, challenge_name: &str) {
        let key = crate::record::RecordKey::new(challenge_name, RecordKind::Txt);
        if let Err(err) = self.storage.delete(&key).await {
            warn!(error = %err, name = %challenge_name, "failed to clean up acme challenge record");
        }
    }

    async fn poll_order_ready(&self, order: &mut instant_acme::Order) -> Result<(), Error> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(ACME_PROPAGATION_TIMEOUT_SECS);
        loop {
            let state = order
                .refresh()
                .await
                .map_err(|err| AcmeError::AuthorizationFailed {
                    domain: "order".to_string(),
                    reason: err.to_string(),
                })?;

            match state.status {
                OrderStatus::Ready | OrderStatus::Valid => return Ok(()),
                OrderStatus::Invalid => {
                    return Err(AcmeError::AuthorizationFailed {
                        domain: "order".to_string(),
                        reason: "order became invalid".into(),
                    }
                    .into());
                }
                OrderStatus::Pending | OrderStatus::Processing => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(AcmeError::PropagationTimeout {
                    domain: "order".to_string(),
                    timeout_secs: ACME_PROPAGATION_TIMEOUT_SECS,
                }
                .into());
            }
            tokio::time::sleep(Duration::from_secs(ACME_PROPAGATION_POLL_INTERVAL_SECS)).await;
        }
    }

    /// Builds a key pair and CSR, finalizes the order, and polls for the
    /// issued chain. Returns `(cert_chain_pem, private_key_pem)` — both must
    /// be persisted together, or the certificate is unusable by any TLS
    /// consumer.
    async fn finalize_order(&self, order: &mut instant_acme::Order, domains: &[String]) -> Result<(String, String), Error> {
        let (csr, key_pem) = generate_key_and_csr(domains)?;

        order
            .finalize(&csr)
            .await
            .map_err(|err| AcmeError::AuthorizationFailed {
                domain: domains.first().cloned().unwrap_or_default(),
                reason: err.to_string(),
            })?;

        loop {
            match order.certificate().await {
                Ok(Some(chain)) => return Ok((chain, key_pem)),
                Ok(None) => tokio::time::sleep(Duration::from_secs(ACME_PROPAGATION_POLL_INTERVAL_SECS)).await,
                Err(err) => {
                    return Err(AcmeError::AuthorizationFailed {
                        domain: domains.first().cloned().unwrap_or_default(),
                        reason: err.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    /// Runs the periodic renewal ticker until `cancel` fires. On every tick,
    /// re-discovers the managed domain set from the [`CertStore`] (so newly
    /// issued certificates are picked up without a restart) and reissues any
    /// whose remaining validity has dropped below the renewal threshold.
    /// Failures are logged and retried on the next tick.
    pub async fn run_renewal_ticker(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(RENEWAL_RETRY_DELAY_SECS));
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    let domains = match self.cert_store.list_managed_domains().await {
                        Ok(domains) => domains,
                        Err(err) => {
                            warn!(error = %err, "failed to list managed certificate domains for renewal");
                            continue;
                        }
                    };
                    for domain in domains {
                        let request = IssuanceRequest { primary_domain: domain, additional_sans: Vec::new() };
                        self.renew_if_due(&request).await;
                    }
                }
            }
        }
    }

    async fn renew_if_due(&self, request: &IssuanceRequest) {
        let status = match self.cert_store.status(&request.primary_domain).await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, domain = %request.primary_domain, "failed to read certificate status");
                return;
            }
        };

        metrics::set_acme_certificate_remaining_days(&request.primary_domain, status.remaining_days);

        if status.remaining_days > self.renewal_threshold_days {
            return;
        }

        info!(domain = %request.primary_domain, remaining_days = status.remaining_days, "renewing certificate");
        if let Err(err) = self.issue(request).await {
            metrics::record_acme_issuance(&request.primary_domain, false);
            error!(error = %err, domain = %request.primary_domain, "certificate renewal failed");
        }
    }
}

/// The DNS-01 challenge record name for `domain`: `_acme-challenge.<domain>`.
#[must_use]
pub fn challenge_record_name(domain: &str) -> String {
    format!("_acme-challenge.{}", domain.trim_end_matches('.'))
}

/// Generates a fresh key pair and a DER-encoded CSR for `domains`, returning
/// `(csr_der, private_key_pem)`. Kept separate from [`AcmeManager::finalize_order`]
/// so the key material this certificate depends on is testable without a live order.
fn generate_key_and_csr(domains: &[String]) -> Result<(Vec<u8>, String), Error> {
    let mut params = CertificateParams::new(domains.to_vec());
    params.distinguished_name = DistinguishedName::new();
    let cert = Certificate::from_params(params).map_err(|err| Error::Fatal(format!("failed to generate certificate key pair: {err}")))?;
    let csr = cert
        .serialize_request_der()
        .map_err(|err| Error::Fatal(format!("failed to serialize CSR: {err}")))?;
    let key_pem = cert.serialize_private_key_pem();
    Ok((csr, key_pem))
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
