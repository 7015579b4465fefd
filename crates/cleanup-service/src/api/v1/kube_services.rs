/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Orphaned kube services of both collections.

use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use cleanup_models::models::{Collection, KubeService};
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up kube service routes");
    Router::new()
        .route(
            "/pipelinekubeservices",
            get(list_orphaned_pipeline_kube_services).delete(delete_orphaned_pipeline_kube_services),
        )
        .route(
            "/pipelinekubeservices/:id",
            delete(delete_orphaned_pipeline_kube_service),
        )
        .route(
            "/servingkubeservices",
            get(list_orphaned_serving_kube_services).delete(delete_orphaned_serving_kube_services),
        )
        .route(
            "/servingkubeservices/:id",
            delete(delete_orphaned_serving_kube_service),
        )
}

async fn list(service: &CleanupService, collection: Collection) -> Result<Json<Vec<KubeService>>, CleanupError> {
    info!("Handling request to list orphaned {} kube services", collection);
    Ok(Json(service.get_orphaned_kube_services(collection).await?))
}

async fn delete_all(
    service: &CleanupService,
    collection: Collection,
) -> Result<Json<Vec<KubeService>>, CleanupError> {
    info!("Handling request to delete orphaned {} kube services", collection);
    let deleted = service.delete_orphaned_kube_services(collection).await?;
    info!("Deleted {} orphaned {} kube services", deleted.len(), collection);
    Ok(Json(deleted))
}

async fn delete_one(
    service: &CleanupService,
    collection: Collection,
    id: &str,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete {} kube service {}", collection, id);
    service.delete_orphaned_kube_service(collection, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/pipelinekubeservices",
    responses(
        (status = 200, description = "Pipeline kube services whose target workload is gone", body = Vec<KubeService>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn list_orphaned_pipeline_kube_services(
    State(service): State<CleanupService>,
) -> Result<Json<Vec<KubeService>>, CleanupError> {
    list(&service, Collection::Pipeline).await
}

#[utoipa::path(
    delete,
    path = "/pipelinekubeservices",
    responses(
        (status = 200, description = "Deleted kube services", body = Vec<KubeService>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn delete_orphaned_pipeline_kube_services(
    State(service): State<CleanupService>,
) -> Result<Json<Vec<KubeService>>, CleanupError> {
    delete_all(&service, Collection::Pipeline).await
}

#[utoipa::path(
    delete,
    path = "/pipelinekubeservices/{id}",
    params(("id" = String, Path, description = "Kube service id")),
    responses(
        (status = 204, description = "Kube service deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Kube service not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn delete_orphaned_pipeline_kube_service(
    State(service): State<CleanupService>,
    Path(id): Path<String>,
) -> Result<StatusCode, CleanupError> {
    delete_one(&service, Collection::Pipeline, &id).await
}

#[utoipa::path(
    get,
    path = "/servingkubeservices",
    responses(
        (status = 200, description = "Serving kube services whose target workload is gone", body = Vec<KubeService>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn list_orphaned_serving_kube_services(
    State(service): State<CleanupService>,
) -> Result<Json<Vec<KubeService>>, CleanupError> {
    list(&service, Collection::Serving).await
}

#[utoipa::path(
    delete,
    path = "/servingkubeservices",
    responses(
        (status = 200, description = "Deleted kube services", body = Vec<KubeService>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn delete_orphaned_serving_kube_services(
    State(service): State<CleanupService>,
) -> Result<Json<Vec<KubeService>>, CleanupError> {
    delete_all(&service, Collection::Serving).await
}

#[utoipa::path(
    delete,
    path = "/servingkubeservices/{id}",
    params(("id" = String, Path, description = "Kube service id")),
    responses(
        (status = 204, description = "Kube service deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Kube service not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "kube-services"
)]
pub async fn delete_orphaned_serving_kube_service(
    State(service): State<CleanupService>,
    Path(id): Path<String>,
) -> Result<StatusCode, CleanupError> {
    delete_one(&service, Collection::Serving, &id).await
}
