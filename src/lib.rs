// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # korenet-dns
//!
//! An authoritative DNS server with recursive fall-through, a
//! hot-reloadable in-memory record store, GeoIP-aware answer ordering, and
//! an embedded ACME (DNS-01) certificate issuer. Runs as a pod-level DNS
//! control plane: records are sourced from a Kubernetes ConfigMap or a
//! JSON file, and issued TLS certificates are persisted as Kubernetes
//! Secrets under a deterministic name derived from the domain.
//!
//! ## Modules
//!
//! - [`record`] - the record value types and storage event model
//! - [`storage`] - Core Storage: the concurrently-readable record set
//! - [`mapping`] - domain ↔ Kubernetes Secret name mapping
//! - [`geoip`] - client-proximity answer ordering
//! - [`dns`] - the resolution pipeline: frontend, backend, upstream client
//! - [`adapters`] - the ConfigMap and JSON file source adapters
//! - [`acme`] - ACME account registration, DNS-01 issuance, renewal
//! - [`config`] - application configuration
//! - [`metrics`] - Prometheus metrics
//! - [`http`] - the `/healthz`, `/metrics`, `/certs` management surface

pub mod acme;
pub mod adapters;
pub mod config;
pub mod constants;
pub mod dns;
pub mod errors;
pub mod geoip;
pub mod http;
pub mod labels;
pub mod mapping;
pub mod metrics;
pub mod record;
pub mod storage;
