/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::*;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cleanup_models::models::{Collection, DeleteStatus, Pipeline};
use cleanup_utils::config::Settings;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

const UUID_A: &str = "0a0a0a0a-1111-4222-8333-444444444444";

fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", admin_token("admin-1")))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let fixture = TestFixture::new();
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/healthz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/readyz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Ready");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/metrics")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; version=0.0.4"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cleanup_kafka_delete_running"));
}

#[tokio::test]
async fn test_admin_routes_reject_non_admins() {
    let fixture = TestFixture::new();
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/pipeservices")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Admin access required");

    let response = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/kafkatopics")
            .header("Authorization", format!("Bearer {}", token("u1", &["user"])))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        fixture.service.get_delete_orphaned_kafka_topics_status(),
        DeleteStatus::default()
    );
}

#[tokio::test]
async fn test_roles_header_grants_admin() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/pipeservices")
            .header("X-User-Roles", "user, admin")
            .header("X-UserId", "u1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        fixture.pipelines.list_calls.lock().unwrap()[0].0,
        "u1".to_string()
    );
}

#[tokio::test]
async fn test_list_orphaned_pipelines() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    fixture.add_pipeline(pipeline("p2", "u1"));
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-p2-adder");
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("GET", "/pipeservices")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let pipes: Vec<Pipeline> = serde_json::from_slice(&body).unwrap();
    assert_eq!(pipes.len(), 1);
    assert_eq!(pipes[0].id, "p1");

    let calls = fixture.pipelines.list_calls.lock().unwrap();
    assert_eq!(calls[0].0, "admin-1");
    assert_eq!(calls[0].1, admin_token("admin-1"));
}

#[tokio::test]
async fn test_delete_single_pipeline() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("DELETE", "/pipeservices/p1")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fixture.pipelines.pipelines.lock().unwrap().is_empty());

    let response = send(&app, admin_request("DELETE", "/pipeservices/p1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_delete_failure_is_internal_error() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    fixture
        .pipelines
        .failing_deletes
        .lock()
        .unwrap()
        .insert("p1".to_string());
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("DELETE", "/pipeservices")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_kafka_bulk_delete_over_http() {
    let fixture = TestFixture::new();
    fixture.add_topics(&[&format!("analytics-{}-x-changelog", UUID_A)]);
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("DELETE", "/kafkatopics")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let started: DeleteStatus = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(started.total, 1);

    fixture.wait_for_kafka_delete().await;

    let response = send(&app, admin_request("GET", "/kafkatopics/status")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: DeleteStatus = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(status.remaining, 0);
    assert!(!status.running);
    assert!(fixture.topics.topic_names().is_empty());
}

#[tokio::test]
async fn test_kafka_conflicts_over_http() {
    let fixture = TestFixture::with_kafka_interval(Duration::from_secs(60));
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("POST", "/kafkatopics/stop")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    fixture.add_topics(&[
        &format!("analytics-{}-a-repartition", UUID_A),
        &format!("analytics-{}-b-repartition", UUID_A),
    ]);
    let response = send(&app, admin_request("DELETE", "/kafkatopics")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = send(&app, admin_request("DELETE", "/kafkatopics")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, admin_request("POST", "/kafkatopics/stop")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let status = fixture.wait_for_kafka_delete().await;
    assert_eq!(status.errors.last().map(String::as_str), Some("aborted"));
}

#[tokio::test]
async fn test_delete_single_topic_over_http() {
    let fixture = TestFixture::new();
    let topic = format!("analytics-{}-x-changelog", UUID_A);
    fixture.add_topics(&[&topic]);
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("DELETE", &format!("/kafkatopics/{}", topic))).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fixture.topics.topic_names().is_empty());
}

#[tokio::test]
async fn test_orphaned_measurements_over_http() {
    let fixture = TestFixture::new();
    fixture.add_serving(serving("s1", "db1", "m1"));
    fixture.add_measurements("db1", &["m1", "stale"]);
    let app = fixture.create_test_router();

    let response = send(&app, admin_request("GET", "/influxmeasurements")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = send(&app, admin_request("DELETE", "/influxmeasurements/db1/stale")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        fixture.measurements.measurements.lock().unwrap()["db1"],
        vec!["m1".to_string()]
    );
}

#[tokio::test]
async fn test_url_prefix_nests_routes() {
    let fixture = TestFixture::new();
    let mut settings = Settings::new(None).unwrap();
    settings.server.url_prefix = "cleanup/".to_string();
    let app = fixture.create_test_router_with(&settings);

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/cleanup/healthz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, admin_request("GET", "/cleanup/kafkatopics")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, admin_request("GET", "/kafkatopics")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let fixture = TestFixture::new();
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/healthz")
            .header("Origin", "https://ui.example.com")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let fixture = TestFixture::new();
    let app = fixture.create_test_router();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/kafkatopics"].is_object());
    assert!(json["paths"]["/pipeservices/{id}"].is_object());
    assert!(json["components"]["securitySchemes"]["admin_bearer"].is_object());
}
