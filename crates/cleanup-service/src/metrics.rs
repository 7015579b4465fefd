/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! Prometheus metrics of the cleanup service, served on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};

/// Global Prometheus registry for all cleanup metrics
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Deleted orphans
/// Labels: category
pub static ORPHANS_DELETED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cleanup_orphans_deleted_total",
        "Total number of orphaned resources deleted by category",
    );
    let counter =
        CounterVec::new(opts, &["category"]).expect("Failed to create orphans deleted counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register orphans deleted counter");
    counter
});

/// Failed orphan deletions
/// Labels: category
pub static DELETE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cleanup_delete_failures_total",
        "Total number of failed orphan deletions by category",
    );
    let counter =
        CounterVec::new(opts, &["category"]).expect("Failed to create delete failures counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register delete failures counter");
    counter
});

/// Topics left in the current kafka bulk delete
pub static KAFKA_DELETE_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "cleanup_kafka_delete_remaining",
        "Topics not yet processed by the kafka bulk delete",
    );
    let gauge = IntGauge::with_opts(opts).expect("Failed to create kafka remaining gauge");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("Failed to register kafka remaining gauge");
    gauge
});

/// 1 while a kafka bulk delete is running
pub static KAFKA_DELETE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "cleanup_kafka_delete_running",
        "Whether a kafka bulk delete is running",
    );
    let gauge = IntGauge::with_opts(opts).expect("Failed to create kafka running gauge");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("Failed to register kafka running gauge");
    gauge
});

/// HTTP request counter
/// Labels: method, status
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cleanup_http_requests_total",
        "Total number of HTTP requests by method and status",
    );
    let counter = CounterVec::new(opts, &["method", "status"])
        .expect("Failed to create HTTP requests counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register HTTP requests counter");
    counter
});

pub fn record_deleted(category: &str) {
    ORPHANS_DELETED_TOTAL.with_label_values(&[category]).inc();
}

pub fn record_failure(category: &str) {
    DELETE_FAILURES_TOTAL.with_label_values(&[category]).inc();
}

/// Encodes all registered metrics in Prometheus text format
pub fn encode_metrics() -> String {
    // touch the lazies so every family shows up before the first event
    Lazy::force(&ORPHANS_DELETED_TOTAL);
    Lazy::force(&DELETE_FAILURES_TOTAL);
    Lazy::force(&KAFKA_DELETE_REMAINING);
    Lazy::force(&KAFKA_DELETE_RUNNING);
    Lazy::force(&HTTP_REQUESTS_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# failed to encode metrics: {}\n", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
