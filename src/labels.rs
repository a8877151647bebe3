// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label constants applied to Kubernetes resources this server creates
//! (certificate Secrets, the records ConfigMap when run in outbound-sync mode).

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for the tool managing this resource
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the component within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Value for `app.kubernetes.io/managed-by` on resources this server writes
pub const MANAGED_BY_DNS_SERVER: &str = "korenet-dns";

/// Component value for certificate Secrets produced by the ACME provider
pub const COMPONENT_ACME_SECRET: &str = "acme-certificate";

/// Component value for the records ConfigMap written by outbound sync
pub const COMPONENT_RECORDS_CONFIGMAP: &str = "dns-records";

/// Annotation recording the domain a certificate Secret was issued for
pub const DOMAIN_ANNOTATION: &str = "korenet-dns.firestoned.io/domain";

/// Annotation recording the last successful renewal time (RFC 3339) on a certificate Secret
pub const RENEWED_AT_ANNOTATION: &str = "korenet-dns.firestoned.io/renewed-at";
