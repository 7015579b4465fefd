/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod kafka;
pub mod kube_services;
pub mod measurements;
pub mod middleware;
pub mod openapi;
pub mod pipelines;
pub mod servings;
pub mod workloads;

use crate::reconcile::CleanupService;
use axum::middleware::from_fn;
use axum::Router;

/// Admin routes; every one of them requires the admin role.
pub fn routes() -> Router<CleanupService> {
    Router::new()
        .merge(pipelines::routes())
        .merge(workloads::routes())
        .merge(kube_services::routes())
        .merge(kafka::routes())
        .merge(servings::routes())
        .merge(measurements::routes())
        .layer(from_fn(middleware::admin_middleware))
}
