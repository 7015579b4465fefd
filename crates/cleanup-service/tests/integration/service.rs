/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::*;
use cleanup_models::models::{Collection, DeleteStatus, InfluxMeasurement};
use cleanup_service::error::CleanupError;
use cleanup_service::reconcile::service::ABORTED;
use std::sync::atomic::Ordering;
use std::time::Duration;

const UUID_A: &str = "0a0a0a0a-1111-4222-8333-444444444444";
const UUID_B: &str = "0b0b0b0b-1111-4222-8333-444444444444";
const UUID_C: &str = "0c0c0c0c-1111-4222-8333-444444444444";
const UUID_LIVE: &str = "0d0d0d0d-1111-4222-8333-444444444444";

fn internal_topic(uuid: &str) -> String {
    format!("analytics-{}-KSTREAM-REDUCE-STATE-STORE-0000000001-repartition", uuid)
}

async fn wait_for_remaining(fixture: &TestFixture, remaining: usize) {
    for _ in 0..500 {
        if fixture
            .service
            .get_delete_orphaned_kafka_topics_status()
            .remaining
            == remaining
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("kafka delete never reached {} remaining topics", remaining);
}

#[tokio::test]
async fn test_orphaned_kafka_topics_are_internal_and_without_pipeline() {
    let fixture = TestFixture::new();
    fixture.add_topics(&[
        &internal_topic(UUID_A),
        &internal_topic(UUID_LIVE),
        "device-data",
        &format!("analytics-{}", UUID_B),
    ]);
    fixture.driver.add_env(&format!("{}-adder", UUID_LIVE));

    let orphans = fixture.service.get_orphaned_kafka_topics().await.unwrap();

    assert_eq!(orphans, vec![internal_topic(UUID_A)]);
}

#[tokio::test]
async fn test_kafka_bulk_delete_records_failures_and_continues() {
    let fixture = TestFixture::new();
    let (a, b, c) = (
        internal_topic(UUID_A),
        internal_topic(UUID_B),
        internal_topic(UUID_C),
    );
    fixture.add_topics(&[&a, &b, &c, &internal_topic(UUID_LIVE), "device-data"]);
    fixture.driver.add_env(&format!("analytics-{}-adder", UUID_LIVE));
    fixture.topics.failing.lock().unwrap().insert(b.clone());

    let started = fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    assert_eq!(started.total, 3);
    assert!(started.running);

    let status = fixture.wait_for_kafka_delete().await;

    assert_eq!(status.total, 3);
    assert_eq!(status.remaining, 0);
    assert!(!status.running);
    assert_eq!(status.errors.len(), 1);
    assert!(status.errors[0].contains(&b));

    let left = fixture.topics.topic_names();
    assert!(!left.contains(&a));
    assert!(!left.contains(&c));
    assert!(left.contains(&b));
    assert!(left.contains(&internal_topic(UUID_LIVE)));
    assert!(left.contains(&"device-data".to_string()));
}

#[tokio::test]
async fn test_kafka_bulk_delete_with_nothing_to_delete() {
    let fixture = TestFixture::new();
    fixture.add_topics(&["device-data"]);

    let started = fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    assert_eq!(started.total, 0);

    let status = fixture.wait_for_kafka_delete().await;
    assert_eq!(status.remaining, 0);
    assert!(status.errors.is_empty());
    assert_eq!(fixture.topics.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_bulk_delete_conflicts_and_keeps_status() {
    let fixture = TestFixture::with_kafka_interval(Duration::from_secs(60));
    fixture.add_topics(&[&internal_topic(UUID_A), &internal_topic(UUID_B)]);

    fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    wait_for_remaining(&fixture, 1).await;

    let before = fixture.service.get_delete_orphaned_kafka_topics_status();
    let result = fixture.service.delete_orphaned_kafka_topics().await;
    assert!(matches!(result, Err(CleanupError::Conflict(_))));

    let after = fixture.service.get_delete_orphaned_kafka_topics_status();
    assert_eq!(before, after);
    assert_eq!(after.total, 2);
    assert!(after.running);

    fixture.service.stop_delete_orphaned_kafka_topics().unwrap();
    fixture.wait_for_kafka_delete().await;
}

#[tokio::test]
async fn test_stop_aborts_and_freezes_remaining() {
    let fixture = TestFixture::with_kafka_interval(Duration::from_secs(60));
    fixture.add_topics(&[
        &internal_topic(UUID_A),
        &internal_topic(UUID_B),
        &internal_topic(UUID_C),
    ]);

    fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    wait_for_remaining(&fixture, 2).await;

    fixture.service.stop_delete_orphaned_kafka_topics().unwrap();
    let status = fixture.wait_for_kafka_delete().await;

    assert!(!status.running);
    assert_eq!(status.remaining, 2);
    assert_eq!(status.errors, vec![ABORTED.to_string()]);
    assert_eq!(fixture.topics.delete_calls.load(Ordering::SeqCst), 1);

    // a new run may start once the aborted one is gone
    let restarted = fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    assert_eq!(restarted.total, 2);
    assert!(restarted.errors.is_empty());
    fixture.service.stop_delete_orphaned_kafka_topics().unwrap();
    fixture.wait_for_kafka_delete().await;
}

#[tokio::test]
async fn test_run_is_active_while_topics_are_listed() {
    let fixture = TestFixture::with_kafka_interval(Duration::from_secs(60));
    fixture.add_topics(&[&internal_topic(UUID_A), &internal_topic(UUID_B)]);
    let listing = fixture.topics.listing.lock().await;

    let service = fixture.service.clone();
    let start = tokio::spawn(async move { service.delete_orphaned_kafka_topics().await });
    for _ in 0..500 {
        if fixture.service.get_delete_orphaned_kafka_topics_status().running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(fixture.service.get_delete_orphaned_kafka_topics_status().running);

    assert!(matches!(
        fixture.service.delete_orphaned_kafka_topics().await,
        Err(CleanupError::Conflict(_))
    ));
    fixture.service.stop_delete_orphaned_kafka_topics().unwrap();
    drop(listing);

    let status = start.await.unwrap().unwrap();
    assert!(!status.running);
    assert_eq!(status.total, 2);
    assert_eq!(status.remaining, 2);
    assert_eq!(status.errors, vec![ABORTED.to_string()]);
    assert_eq!(fixture.service.get_delete_orphaned_kafka_topics_status(), status);
    assert_eq!(fixture.topics.delete_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.topics.topic_names().len(), 2);

    let restarted = fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    assert!(restarted.running);
    fixture.service.stop_delete_orphaned_kafka_topics().unwrap();
    fixture.wait_for_kafka_delete().await;
}

#[tokio::test]
async fn test_failed_listing_keeps_previous_status() {
    let fixture = TestFixture::new();
    fixture.add_topics(&[&internal_topic(UUID_A)]);
    fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    let previous = fixture.wait_for_kafka_delete().await;

    fixture.topics.fail_listing.store(true, Ordering::SeqCst);
    assert!(matches!(
        fixture.service.delete_orphaned_kafka_topics().await,
        Err(CleanupError::Upstream(_))
    ));

    assert_eq!(fixture.service.get_delete_orphaned_kafka_topics_status(), previous);
    assert!(matches!(
        fixture.service.stop_delete_orphaned_kafka_topics(),
        Err(CleanupError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_stop_without_run_conflicts() {
    let fixture = TestFixture::new();

    assert_eq!(
        fixture.service.get_delete_orphaned_kafka_topics_status(),
        DeleteStatus::default()
    );
    assert!(matches!(
        fixture.service.stop_delete_orphaned_kafka_topics(),
        Err(CleanupError::Conflict(_))
    ));

    fixture.add_topics(&[&internal_topic(UUID_A)]);
    fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    fixture.wait_for_kafka_delete().await;

    assert!(matches!(
        fixture.service.stop_delete_orphaned_kafka_topics(),
        Err(CleanupError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_shutdown_cancels_bulk_delete() {
    let fixture = TestFixture::with_kafka_interval(Duration::from_secs(60));
    fixture.add_topics(&[&internal_topic(UUID_A), &internal_topic(UUID_B)]);

    fixture.service.delete_orphaned_kafka_topics().await.unwrap();
    wait_for_remaining(&fixture, 1).await;

    fixture.shutdown.cancel();
    let status = fixture.wait_for_kafka_delete().await;

    assert_eq!(status.errors, vec![ABORTED.to_string()]);
    assert_eq!(status.remaining, 1);
}

#[tokio::test]
async fn test_single_topic_delete_tolerates_missing_topic() {
    let fixture = TestFixture::new();
    fixture.add_topics(&[&internal_topic(UUID_A)]);

    fixture
        .service
        .delete_orphaned_kafka_topic(&internal_topic(UUID_A))
        .await
        .unwrap();
    fixture
        .service
        .delete_orphaned_kafka_topic(&internal_topic(UUID_A))
        .await
        .unwrap();

    assert!(fixture.topics.topic_names().is_empty());
}

#[tokio::test]
async fn test_orphaned_pipeline_is_detected_and_deleted() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    fixture.add_pipeline(pipeline("p2", "u1"));
    fixture.add_pipeline(local_pipeline("p3", "u1"));
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-p2-adder");

    let orphans = fixture
        .service
        .get_orphaned_pipeline_services("u1", "caller-token")
        .await
        .unwrap();
    assert_eq!(
        orphans.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec!["p1"]
    );

    let deleted = fixture
        .service
        .delete_orphaned_pipeline_services("u1", "caller-token")
        .await
        .unwrap();
    assert_eq!(deleted.len(), 1);

    let remaining: Vec<String> = fixture
        .pipelines
        .pipelines
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.id.clone())
        .collect();
    assert_eq!(remaining, vec!["p2", "p3"]);
    assert_eq!(
        *fixture.pipelines.delete_tokens.lock().unwrap(),
        vec![("p1".to_string(), "caller-token".to_string())]
    );
}

#[tokio::test]
async fn test_pipeline_bulk_delete_stops_at_first_failure() {
    let fixture = TestFixture::new();
    for id in ["pa", "pb", "pc"] {
        fixture.add_pipeline(pipeline(id, "u1"));
    }
    fixture
        .pipelines
        .failing_deletes
        .lock()
        .unwrap()
        .insert("pb".to_string());

    let result = fixture
        .service
        .delete_orphaned_pipeline_services("u1", "t")
        .await;
    assert!(matches!(result, Err(CleanupError::Upstream(_))));

    let remaining: Vec<String> = fixture
        .pipelines
        .pipelines
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.id.clone())
        .collect();
    assert_eq!(remaining, vec!["pb", "pc"]);
}

#[tokio::test]
async fn test_detection_propagates_collaborator_errors() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    fixture.driver.fail_workloads.store(true, Ordering::SeqCst);

    let result = fixture
        .service
        .get_orphaned_pipeline_services("u1", "t")
        .await;
    assert!(matches!(result, Err(CleanupError::Upstream(_))));
}

#[tokio::test]
async fn test_orphaned_analytics_workloads() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "u1"));
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-p1-adder");
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-zz-adder");

    let orphans = fixture
        .service
        .get_orphaned_analytics_workloads("u1", "t")
        .await
        .unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].name, "pipeline-zz-adder");

    fixture
        .service
        .delete_orphaned_analytics_workloads("u1", "t")
        .await
        .unwrap();
    assert_eq!(
        *fixture.driver.deleted_workloads.lock().unwrap(),
        vec!["pipeline-zz-adder".to_string()]
    );

    let missing = fixture
        .service
        .delete_orphaned_analytics_workload("pipeline-zz-adder")
        .await;
    assert!(matches!(missing, Err(CleanupError::NotFound(_))));
}

#[tokio::test]
async fn test_orphaned_kube_services() {
    let fixture = TestFixture::new();
    fixture.driver.add_workload(Collection::Pipeline, "pipe-1");
    fixture
        .driver
        .add_service(Collection::Pipeline, "svc-a", "deployment:ns:pipe-1");
    fixture
        .driver
        .add_service(Collection::Pipeline, "svc-b", "deployment:ns:gone");
    fixture.driver.add_service(Collection::Pipeline, "svc-c", "pipe-1");
    fixture
        .driver
        .add_service(Collection::Serving, "svc-d", "deployment:ns:pipe-1");

    let orphans = fixture
        .service
        .get_orphaned_kube_services(Collection::Pipeline)
        .await
        .unwrap();
    let ids: Vec<&str> = orphans.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["svc-b", "svc-c"]);

    let deleted = fixture
        .service
        .delete_orphaned_kube_services(Collection::Pipeline)
        .await
        .unwrap();
    assert_eq!(deleted.len(), 2);
    assert_eq!(
        *fixture.driver.deleted_services.lock().unwrap(),
        vec!["svc-b".to_string(), "svc-c".to_string()]
    );

    // serving services are matched against serving workloads
    let serving_orphans = fixture
        .service
        .get_orphaned_kube_services(Collection::Serving)
        .await
        .unwrap();
    assert_eq!(serving_orphans.len(), 1);
}

#[tokio::test]
async fn test_orphaned_servings_and_serving_workloads() {
    let fixture = TestFixture::new();
    fixture.add_serving(serving("s1", "db1", "m1"));
    fixture.add_serving(serving("s2", "db1", "m2"));
    fixture.driver.add_workload(Collection::Serving, "kafka2influx-s1");
    fixture.driver.add_workload(Collection::Serving, "kafka2influx-old");

    let orphans = fixture
        .service
        .get_orphaned_serving_services("u1", "t")
        .await
        .unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, "s2");

    let workloads = fixture
        .service
        .get_orphaned_serving_workloads("u1", "t")
        .await
        .unwrap();
    assert_eq!(workloads.len(), 1);
    assert_eq!(workloads[0].name, "kafka2influx-old");

    fixture
        .service
        .delete_orphaned_serving_services("u1", "t")
        .await
        .unwrap();
    fixture
        .service
        .delete_orphaned_serving_workloads("u1", "t")
        .await
        .unwrap();

    assert_eq!(fixture.servings.servings.lock().unwrap().len(), 1);
    assert_eq!(
        *fixture.driver.deleted_workloads.lock().unwrap(),
        vec!["kafka2influx-old".to_string()]
    );
}

#[tokio::test]
async fn test_orphaned_influx_measurements() {
    let fixture = TestFixture::new();
    fixture.add_serving(serving("s1", "db1", "m1"));
    fixture.add_serving(serving("s2", "db2", "m2"));
    fixture.add_serving(serving("s3", "db1", "m3"));
    fixture.add_measurements("db1", &["m1", "m3", "stale"]);
    fixture.add_measurements("db2", &["m2", "m1"]);
    fixture.add_measurements("db3", &["unrelated"]);

    let orphans = fixture
        .service
        .get_orphaned_influx_measurements("u1", "t")
        .await
        .unwrap();

    assert_eq!(
        orphans,
        vec![InfluxMeasurement {
            id: "stale".to_string(),
            database_id: "db1".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_force_delete_repeats_until_measurement_is_gone() {
    let fixture = TestFixture::new();
    fixture.add_measurements("db1", &["m1", "m2"]);
    fixture
        .measurements
        .reappears
        .lock()
        .unwrap()
        .insert("m1".to_string(), 2);

    fixture
        .service
        .force_delete_measurement("db1", "m1")
        .await
        .unwrap();

    assert_eq!(fixture.measurements.drop_calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        fixture.measurements.measurements.lock().unwrap()["db1"],
        vec!["m2".to_string()]
    );
}

#[tokio::test]
async fn test_force_delete_gives_up_after_max_attempts() {
    let fixture = TestFixture::new();
    fixture.add_measurements("db1", &["m1"]);
    fixture
        .measurements
        .reappears
        .lock()
        .unwrap()
        .insert("m1".to_string(), 100);

    let result = fixture.service.force_delete_measurement("db1", "m1").await;

    assert!(matches!(result, Err(CleanupError::Upstream(_))));
    assert_eq!(fixture.measurements.drop_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_cleanup_pass_recreates_missing_pipelines() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "owner-1"));
    fixture.add_pipeline(pipeline("p2", "owner-2"));
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-p2-adder");

    fixture
        .service
        .start_cleanup_service(true, false)
        .await
        .unwrap();

    assert_eq!(
        fixture.pipelines.list_calls.lock().unwrap()[0],
        (SERVICE_USER.to_string(), SERVICE_TOKEN.to_string())
    );
    let created = fixture.pipelines.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let (request, user_id, token) = &created[0];
    assert_eq!(request.id, "p1");
    assert_eq!(user_id, "owner-1");
    assert_eq!(token, "token-of-owner-1");
}

#[tokio::test]
async fn test_cleanup_pass_disabled_does_nothing() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "owner-1"));

    fixture
        .service
        .start_cleanup_service(false, false)
        .await
        .unwrap();

    assert!(fixture.pipelines.list_calls.lock().unwrap().is_empty());
    assert!(fixture.pipelines.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_recreation_continues_after_failed_submission() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "owner-1"));
    fixture.add_pipeline(pipeline("p3", "owner-3"));
    fixture
        .pipelines
        .failing_creates
        .lock()
        .unwrap()
        .insert("p1".to_string());

    fixture
        .service
        .start_cleanup_service(true, false)
        .await
        .unwrap();

    let created = fixture.pipelines.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0.id, "p3");
}

#[tokio::test]
async fn test_recreation_aborts_without_impersonation_token() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "owner-1"));
    fixture
        .identity
        .fail_impersonation
        .store(true, Ordering::SeqCst);

    let result = fixture.service.start_cleanup_service(true, false).await;

    assert!(matches!(result, Err(CleanupError::Upstream(_))));
    assert!(fixture.pipelines.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_workload_listing_failure_recreates_every_pipeline() {
    let fixture = TestFixture::new();
    fixture.add_pipeline(pipeline("p1", "owner-1"));
    fixture.add_pipeline(pipeline("p2", "owner-2"));
    fixture.driver.add_workload(Collection::Pipeline, "pipeline-p2-adder");
    fixture.driver.fail_workloads.store(true, Ordering::SeqCst);

    fixture
        .service
        .start_cleanup_service(true, false)
        .await
        .unwrap();

    assert_eq!(fixture.pipelines.created.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cleanup_pass_recreates_serving_workloads() {
    let fixture = TestFixture::new();
    fixture.add_serving(serving("s1", "db1", "m1"));
    fixture.add_serving(serving("s2", "db1", "m2"));
    fixture.add_serving(serving("s3", "db1", "m3"));
    fixture.driver.add_workload(Collection::Serving, "kafka2influx-s1");
    fixture
        .driver
        .failing_creates
        .lock()
        .unwrap()
        .insert("s2".to_string());

    fixture
        .service
        .start_cleanup_service(false, true)
        .await
        .unwrap();

    assert_eq!(
        *fixture.driver.created_servings.lock().unwrap(),
        vec!["s3".to_string()]
    );
    assert!(fixture.pipelines.created.lock().unwrap().is_empty());
}
