// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Minimal HTTP management surface: `/healthz`, `/metrics`, and `/certs`.
//!
//! A bare `axum::Router` bound with `tokio::net::TcpListener` +
//! `axum::serve`, with an optional bearer-token auth layer and a
//! certificate-status route backed by the ACME [`CertStore`].

use crate::acme::CertStore;
use crate::constants::{CERT_STATUS_PATH, HEALTHZ_PATH, METRICS_SERVER_PATH};
use crate::metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Shared state for the HTTP management surface.
#[derive(Clone)]
pub struct HttpState {
    cert_store: Option<Arc<dyn CertStore>>,
    bearer_token: Option<Arc<str>>,
}

impl HttpState {
    /// Builds state for a server. `cert_store` is `None` when the ACME
    /// provider is disabled, in which case `/certs` reports an empty list
    /// rather than touching Kubernetes. `bearer_token`, when set, is
    /// required (as `Authorization: Bearer <token>`) on every request.
    #[must_use]
    pub fn new(cert_store: Option<Arc<dyn CertStore>>, bearer_token: Option<String>) -> Self {
        Self {
            cert_store,
            bearer_token: bearer_token.map(Into::into),
        }
    }
}

/// Builds the management router. Routes are unauthenticated unless
/// `state.bearer_token` is set, in which case every route requires it.
#[must_use]
pub fn router(state: HttpState) -> Router {
    let router = Router::new()
        .route(HEALTHZ_PATH, get(healthz))
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(CERT_STATUS_PATH, get(certs_handler))
        .with_state(state.clone());

    if state.bearer_token.is_some() {
        router.layer(middleware::from_fn_with_state(state, require_bearer_token))
    } else {
        router
    }
}

async fn require_bearer_token(State(state): State<HttpState>, request: axum::extract::Request, next: Next) -> Response {
    let Some(expected) = &state.bearer_token else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected.as_ref() => next.run(request).await,
        _ => (StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(text) => text.into_response(),
        Err(err) => {
            error!(error = %err, "failed to gather metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "# error gathering metrics\n").into_response()
        }
    }
}

/// Certificate status entry returned by `/certs`.
#[derive(Debug, Serialize)]
struct CertStatusEntry {
    domain: String,
    secret_name: String,
    not_after: String,
    remaining_days: i64,
}

async fn certs_handler(State(state): State<HttpState>) -> Response {
    let Some(cert_store) = &state.cert_store else {
        return Json(Vec::<CertStatusEntry>::new()).into_response();
    };

    let domains = match cert_store.list_managed_domains().await {
        Ok(domains) => domains,
        Err(err) => {
            error!(error = %err, "failed to list managed certificate domains");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to list certificates").into_response();
        }
    };

    let mut entries = Vec::with_capacity(domains.len());
    for domain in domains {
        match cert_store.status(&domain).await {
            Ok(status) => entries.push(CertStatusEntry {
                domain: status.domain,
                secret_name: status.secret_name,
                not_after: status.not_after.to_rfc3339(),
                remaining_days: status.remaining_days,
            }),
            Err(err) => error!(error = %err, %domain, "failed to read certificate status"),
        }
    }

    Json(entries).into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod http_tests;
