/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Influx measurements no serving instance writes into.

use crate::api::v1::middleware::Caller;
use crate::error::CleanupError;
use crate::reconcile::CleanupService;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use cleanup_models::models::InfluxMeasurement;
use cleanup_utils::logging::prelude::*;

pub fn routes() -> Router<CleanupService> {
    info!("Setting up influx measurement routes");
    Router::new()
        .route("/influxmeasurements", get(list_orphaned_measurements))
        .route(
            "/influxmeasurements/:database/:measurement",
            delete(delete_measurement),
        )
}

#[utoipa::path(
    get,
    path = "/influxmeasurements",
    responses(
        (status = 200, description = "Measurements not referenced by a serving instance", body = Vec<InfluxMeasurement>),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error")
    ),
    security(("admin_bearer" = [])),
    tag = "influx"
)]
pub async fn list_orphaned_measurements(
    State(service): State<CleanupService>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<InfluxMeasurement>>, CleanupError> {
    info!("Handling request to list orphaned influx measurements");
    let measurements = service
        .get_orphaned_influx_measurements(&caller.user_id, &caller.token)
        .await?;
    Ok(Json(measurements))
}

#[utoipa::path(
    delete,
    path = "/influxmeasurements/{database}/{measurement}",
    params(
        ("database" = String, Path, description = "Influx database"),
        ("measurement" = String, Path, description = "Measurement name")
    ),
    responses(
        (status = 204, description = "Measurement dropped and no longer listed"),
        (status = 403, description = "Forbidden - Admin access required"),
        (status = 500, description = "Internal server error or measurement kept reappearing")
    ),
    security(("admin_bearer" = [])),
    tag = "influx"
)]
pub async fn delete_measurement(
    State(service): State<CleanupService>,
    Path((database, measurement)): Path<(String, String)>,
) -> Result<StatusCode, CleanupError> {
    info!(
        "Handling request to drop influx measurement {}.{}",
        database, measurement
    );
    service
        .force_delete_measurement(&database, &measurement)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
