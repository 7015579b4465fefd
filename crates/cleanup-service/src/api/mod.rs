/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # API Routes Aggregator Module
//!
//! Builds the router of the cleanup service: the admin routes of [`v1`]
//! behind the admin check, the unauthenticated health and metrics probes,
//! the OpenAPI document, CORS and the access log. Everything is nested
//! under `server.url_prefix`.

pub mod v1;

use crate::metrics;
use crate::reconcile::CleanupService;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use cleanup_utils::config::{Cors, Settings};
use cleanup_utils::logging::prelude::*;
use hyper::StatusCode;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Configures the application router. The caller provides the
/// [`CleanupService`] state with `with_state`.
pub fn configure_api_routes(settings: &Settings) -> Router<CleanupService> {
    let routes = Router::new()
        .merge(v1::routes())
        .merge(v1::openapi::configure_openapi())
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler));

    let prefix = settings.server.url_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&normalize_prefix(prefix), routes)
    };

    router
        .layer(cors_layer(&settings.cors))
        .layer(middleware::from_fn(access_log))
}

fn normalize_prefix(prefix: &str) -> String {
    if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    }
}

/// CORS policy from configuration; a `*` origin allows any origin.
pub fn cors_layer(cors: &Cors) -> CorsLayer {
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers: Vec<header::HeaderName> = cors
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(cors.max_age_seconds));

    if cors.allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Logs one line per request and counts it.
async fn access_log(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), status.as_str()])
        .inc();
    if path.ends_with("/healthz") || path.ends_with("/readyz") {
        debug!("{} {} {} {:?}", method, path, status.as_u16(), started.elapsed());
    } else {
        info!("{} {} {} {:?}", method, path, status.as_u16(), started.elapsed());
    }
    response
}

/// Health check endpoint handler
///
/// Returns a 200 OK status code with "OK" in the body.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready check endpoint handler
///
/// Returns a 200 OK status code with "Ready" in the body.
async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

/// Prometheus text exposition of the service metrics.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
