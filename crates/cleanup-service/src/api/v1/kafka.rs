/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Orphaned kafka topics and the background bulk delete.

use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use cleanup_models::models::DeleteStatus;
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up kafka topic routes");
    Router::new()
        .route(
            "/kafkatopics",
            get(list_orphaned_topics).delete(delete_orphaned_topics),
        )
        .route("/kafkatopics/status", get(delete_status))
        .route("/kafkatopics/stop", post(stop_delete))
        .route("/kafkatopics/:name", delete(delete_orphaned_topic))
}

#[utoipa::path(
    get,
    path = "/kafkatopics",
    responses(
        (status = 200, description = "Internal topics of pipelines that no longer run", body = Vec<String>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kafka"
)]
pub async fn list_orphaned_topics(
    State(service): State<CleanupService>,
) -> Result<Json<Vec<String>>, CleanupError> {
    info!("Handling request to list orphaned kafka topics");
    let topics = service.get_orphaned_kafka_topics().await?;
    info!("Found {} orphaned kafka topics", topics.len());
    Ok(Json(topics))
}

#[utoipa::path(
    delete,
    path = "/kafkatopics",
    responses(
        (status = 202, description = "Bulk delete started", body = DeleteStatus),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 409, description = "A bulk delete is already running"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kafka"
)]
pub async fn delete_orphaned_topics(
    State(service): State<CleanupService>,
) -> Result<(StatusCode, Json<DeleteStatus>), CleanupError> {
    info!("Handling request to delete orphaned kafka topics");
    let status = service.delete_orphaned_kafka_topics().await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

#[utoipa::path(
    get,
    path = "/kafkatopics/status",
    responses(
        (status = 200, description = "Progress of the last bulk delete", body = DeleteStatus),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(("admin_bearer" = [])),
    tag = "kafka"
)]
pub async fn delete_status(State(service): State<CleanupService>) -> Json<DeleteStatus> {
    Json(service.get_delete_orphaned_kafka_topics_status())
}

#[utoipa::path(
    post,
    path = "/kafkatopics/stop",
    responses(
        (status = 204, description = "Stop requested"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 409, description = "No bulk delete is running")
    ),
    security(("admin_bearer" = [])),
    tag = "kafka"
)]
pub async fn stop_delete(State(service): State<CleanupService>) -> Result<StatusCode, CleanupError> {
    info!("Handling request to stop kafka topic deletion");
    service.stop_delete_orphaned_kafka_topics()?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/kafkatopics/{name}",
    params(("name" = String, Path, description = "Topic name")),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kafka"
)]
pub async fn delete_orphaned_topic(
    State(service): State<CleanupService>,
    Path(name): Path<String>,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete kafka topic {}", name);
    service.delete_orphaned_kafka_topic(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
