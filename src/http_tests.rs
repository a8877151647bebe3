// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::*;
use crate::acme::secret_store::CertificateBundle;
use crate::acme::{CertStore, CertificateStatus};
use crate::errors::Error;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

struct StubCertStore {
    domains: Vec<String>,
}

#[async_trait]
impl CertStore for StubCertStore {
    async fn persist(&self, _domain: &str, _bundle: CertificateBundle) -> Result<(), Error> {
        unreachable!("not exercised by these tests")
    }

    async fn status(&self, domain: &str) -> Result<CertificateStatus, Error> {
        Ok(CertificateStatus {
            domain: domain.to_string(),
            secret_name: format!("cert-{domain}"),
            not_after: Utc::now(),
            remaining_days: 45,
        })
    }

    async fn list_managed_domains(&self) -> Result<Vec<String>, Error> {
        Ok(self.domains.clone())
    }
}

fn stub_state(domains: Vec<&str>, bearer_token: Option<&str>) -> HttpState {
    HttpState::new(
        Some(Arc::new(StubCertStore {
            domains: domains.into_iter().map(str::to_string).collect(),
        })),
        bearer_token.map(str::to_string),
    )
}

#[tokio::test]
async fn healthz_returns_ok_without_auth() {
    let app = router(stub_state(vec![], None));
    let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_route_returns_prometheus_text() {
    let app = router(stub_state(vec![], None));
    let response = app.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn certs_route_lists_managed_domains() {
    let app = router(stub_state(vec!["api.example.com"], None));
    let response = app.oneshot(Request::builder().uri("/certs").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["domain"], "api.example.com");
}

#[tokio::test]
async fn certs_route_reports_empty_list_when_acme_disabled() {
    let app = router(HttpState::new(None, None));
    let response = app.oneshot(Request::builder().uri("/certs").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn bearer_auth_rejects_missing_token() {
    let app = router(stub_state(vec![], Some("s3cr3t")));
    let response = app.oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_auth_rejects_wrong_token() {
    let app = router(stub_state(vec![], Some("s3cr3t")));
    let response = app
        .oneshot(Request::builder().uri("/healthz").header(header::AUTHORIZATION, "Bearer wrong").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_auth_accepts_correct_token() {
    let app = router(stub_state(vec![], Some("s3cr3t")));
    let response = app
        .oneshot(Request::builder().uri("/healthz").header(header::AUTHORIZATION, "Bearer s3cr3t").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
