/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Orphaned serving instances: registry entries without a transfer workload.

use crate::api::v1::middleware::Caller;
use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use cleanup_models::models::ServingInstance;
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up serving service routes");
    Router::new()
        .route(
            "/servingservices",
            get(list_orphaned_servings).delete(delete_orphaned_servings),
        )
        .route("/servingservices/:id", delete(delete_orphaned_serving))
}

#[utoipa::path(
    get,
    path = "/servingservices",
    responses(
        (status = 200, description = "Serving instances without a workload", body = Vec<ServingInstance>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "servings"
)]
pub async fn list_orphaned_servings(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<ServingInstance>>, CleanupError> {
    info!("Handling request to list orphaned serving instances");
    let servings = service
        .get_orphaned_serving_services(&caller.user_id, &caller.token)
        .await?;
    Ok(Json(servings))
}

#[utoipa::path(
    delete,
    path = "/servingservices",
    responses(
        (status = 200, description = "Deleted serving instances", body = Vec<ServingInstance>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error, deletion stopped at the first failure")
    ),
    security(("admin_bearer" = [])),
    tag = "servings"
)]
pub async fn delete_orphaned_servings(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<ServingInstance>>, CleanupError> {
    info!("Handling request to delete orphaned serving instances");
    let servings = service
        .delete_orphaned_serving_services(&caller.user_id, &caller.token)
        .await?;
    info!("Deleted {} orphaned serving instances", servings.len());
    Ok(Json(servings))
}

#[utoipa::path(
    delete,
    path = "/servingservices/{id}",
    params(("id" = String, Path, description = "Serving instance id")),
    responses(
        (status = 204, description = "Serving instance deleted"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 404, description = "Serving instance not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "servings"
)]
pub async fn delete_orphaned_serving(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, CleanupError> {
    info!("Handling request to delete serving instance {}", id);
    service
        .delete_orphaned_serving_service(&id, &caller.user_id, &caller.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
