/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Orphaned pipelines: registry entries without a workload.

use crate::api::v1::middleware::Caller;
use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use cleanup_models::models::Pipeline;
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up pipeline service routes");
    Router::new()
        .route(
            "/pipeservices",
            get(list_orphaned_pipelines).delete(delete_orphaned_pipelines),
        )
        .route("/pipeservices/:id", delete(delete_orphaned_pipeline))
}

#[utoipa::path(
    get,
    path = "/pipeservices",
    responses(
        (status = 200, description = "Pipelines without a workload", body = Vec<Pipeline>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "pipelines"
)]
pub async fn list_orphaned_pipelines(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Pipeline>>, CleanupError> {
    info!("Handling request to list orphaned pipelines");
    let pipes = service
        .get_orphaned_pipeline_services(&caller.user_id, &caller.token)
        .await?;
    info!("Found {} orphaned pipelines", pipes.len());
    Ok(Json(pipes))
}

#[utoipa::path(
    delete,
    path = "/pipeservices",
    responses(
        (status = 200, description = "Deleted pipelines", body = Vec<Pipeline>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "pipelines"
)]
pub async fn delete_orphaned_pipelines(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Pipeline>>, CleanupError> {
    info!("Handling request to delete orphaned pipelines");
    let pipes = service
        .delete_orphaned_pipeline_services(&caller.user_id, &caller.token)
        .await?;
    info!("Deleted {} orphaned pipelines", pipes.len());
    Ok(Json(pipes))
}

#[utoipa::path(
    delete,
    path = "/pipeservices/{id}",
    params(("id" = String, Path, description = "Pipeline id")),
    responses(
        (status = 204, description = "Pipeline deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Pipeline not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "pipelines"
)]
pub async fn delete_orphaned_pipeline(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete orphaned pipeline {}", id);
    service
        .delete_orphaned_pipeline_service(&id, &caller.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
