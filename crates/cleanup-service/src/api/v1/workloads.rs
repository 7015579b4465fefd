/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Orphaned workloads: analytics workloads without a pipeline and serving
//! transfer workloads without a serving instance.

use crate::api::v1::middleware::Caller;
use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use cleanup_models::models::Workload;
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up workload routes");
    Router::new()
        .route(
            "/analyticsworkloads",
            get(list_orphaned_analytics_workloads).delete(delete_orphaned_analytics_workloads),
        )
        .route(
            "/analyticsworkloads/:name",
            delete(delete_orphaned_analytics_workload),
        )
        .route(
            "/servingworkloads",
            get(list_orphaned_serving_workloads).delete(delete_orphaned_serving_workloads),
        )
        .route(
            "/servingworkloads/:name",
            delete(delete_orphaned_serving_workload),
        )
}

#[utoipa::path(
    get,
    path = "/analyticsworkloads",
    responses(
        (status = 200, description = "Analytics workloads without a pipeline", body = Vec<Workload>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn list_orphaned_analytics_workloads(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Workload>>, CleanupError> {
    info!("Handling request to list orphaned analytics workloads");
    let workloads = service
        .get_orphaned_analytics_workloads(&caller.user_id, &caller.token)
        .await?;
    Ok(Json(workloads))
}

#[utoipa::path(
    delete,
    path = "/analyticsworkloads",
    responses(
        (status = 200, description = "Deleted analytics workloads", body = Vec<Workload>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn delete_orphaned_analytics_workloads(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Workload>>, CleanupError> {
    info!("Handling request to delete orphaned analytics workloads");
    let workloads = service
        .delete_orphaned_analytics_workloads(&caller.user_id, &caller.token)
        .await?;
    info!("Deleted {} orphaned analytics workloads", workloads.len());
    Ok(Json(workloads))
}

#[utoipa::path(
    delete,
    path = "/analyticsworkloads/{name}",
    params(("name" = String, Path, description = "Workload name")),
    responses(
        (status = 204, description = "Workload deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Workload not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn delete_orphaned_analytics_workload(
    State(service): State<CleanupService>,
    Path(name): Path<String>,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete analytics workload {}", name);
    service.delete_orphaned_analytics_workload(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/servingworkloads",
    responses(
        (status = 200, description = "Serving workloads without a serving instance", body = Vec<Workload>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn list_orphaned_serving_workloads(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Workload>>, CleanupError> {
    info!("Handling request to list orphaned serving workloads");
    let workloads = service
        .get_orphaned_serving_workloads(&caller.user_id, &caller.token)
        .await?;
    Ok(Json(workloads))
}

#[utoipa::path(
    delete,
    path = "/servingworkloads",
    responses(
        (status = 200, description = "Deleted serving workloads", body = Vec<Workload>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn delete_orphaned_serving_workloads(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Workload>>, CleanupError> {
    info!("Handling request to delete orphaned serving workloads");
    let workloads = service
        .delete_orphaned_serving_workloads(&caller.user_id, &caller.token)
        .await?;
    info!("Deleted {} orphaned serving workloads", workloads.len());
    Ok(Json(workloads))
}

#[utoipa::path(
    delete,
    path = "/servingworkloads/{name}",
    params(("name" = String, Path, description = "Workload name")),
    responses(
        (status = 204, description = "Workload deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Workload not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "workloads"
)]
pub async fn delete_orphaned_serving_workload(
    State(service): State<CleanupService>,
    Path(name): Path<String>,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete serving workload {}", name);
    service.delete_orphaned_serving_workload(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
