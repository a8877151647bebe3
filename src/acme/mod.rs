// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The ACME / DNS-01 certificate provider: account registration, issuance,
//! renewal, and Kubernetes Secret persistence.

pub mod manager;
pub mod secret_store;

pub use manager::{AcmeManager, AcmeMode, IssuanceRequest};
pub use secret_store::{CertStore, CertificateStatus, SecretCertStore};
