/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api::v1::{kafka, kube_services, measurements, pipelines, servings, workloads};
use crate::reconcile::CleanupService;
use axum::{response::Json, routing::get, Router};
use cleanup_models::models::{
    Collection, DeleteStatus, InfluxMeasurement, InputSelection, InputTopic, KubeService, Mapping,
    Operator, Pipeline, ServingInstance, ServingInstanceValue, Workload,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Analytics Cleanup Service",
        description = "Finds and removes orphaned analytics resources."
    ),
    paths(
        pipelines::list_orphaned_pipelines,
        pipelines::delete_orphaned_pipelines,
        pipelines::delete_orphaned_pipeline,
        workloads::list_orphaned_analytics_workloads,
        workloads::delete_orphaned_analytics_workloads,
        workloads::delete_orphaned_analytics_workload,
        workloads::list_orphaned_serving_workloads,
        workloads::delete_orphaned_serving_workloads,
        workloads::delete_orphaned_serving_workload,
        kube_services::list_orphaned_pipeline_kube_services,
        kube_services::delete_orphaned_pipeline_kube_services,
        kube_services::delete_orphaned_pipeline_kube_service,
        kube_services::list_orphaned_serving_kube_services,
        kube_services::delete_orphaned_serving_kube_services,
        kube_services::delete_orphaned_serving_kube_service,
        kafka::list_orphaned_topics,
        kafka::delete_orphaned_topics,
        kafka::delete_status,
        kafka::stop_delete,
        kafka::delete_orphaned_topic,
        servings::list_orphaned_servings,
        servings::delete_orphaned_servings,
        servings::delete_orphaned_serving,
        measurements::list_orphaned_measurements,
        measurements::delete_measurement,
    ),
    components(
        schemas(
            Pipeline,
            Operator,
            InputTopic,
            Mapping,
            InputSelection,
            Workload,
            KubeService,
            Collection,
            ServingInstance,
            ServingInstanceValue,
            InfluxMeasurement,
            DeleteStatus,
        )
    ),
    tags(
        (name = "pipelines", description = "Orphaned pipelines"),
        (name = "workloads", description = "Orphaned analytics and serving workloads"),
        (name = "kube-services", description = "Orphaned kube services"),
        (name = "kafka", description = "Orphaned internal kafka topics"),
        (name = "servings", description = "Orphaned serving instances"),
        (name = "influx", description = "Orphaned influx measurements")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

pub fn configure_openapi() -> Router<CleanupService> {
    Router::new()
        .route("/docs/openapi.json", get(serve_openapi))
        .merge(SwaggerUi::new("/swagger-ui").url("/docs/swagger-ui.json", ApiDoc::openapi()))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
