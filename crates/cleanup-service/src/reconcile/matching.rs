/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Matching Predicates
//!
//! Answers "is this entity represented among these resources".
//!
//! Resource names embed the identifier of the entity that owns them, so all
//! matching is by substring containment on names. Every such comparison lives
//! in this module; nothing else in the crate compares names.

use cleanup_models::models::{KubeService, Pipeline, ServingInstance, Workload};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Environment key carrying a pipeline's kafka streams application id.
pub const APPLICATION_ID_ENV: &str = "CONFIG_APPLICATION_ID";

static INTERNAL_ANALYTICS_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"analytics-[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}.*-(repartition|changelog)",
    )
    .expect("internal topic pattern is valid")
});

static PIPELINE_ID_IN_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"analytics-([a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})")
        .expect("pipeline id pattern is valid")
});

/// True if some workload's name contains the pipeline id.
pub fn pipe_in_workloads(pipe: &Pipeline, workloads: &[Workload]) -> bool {
    workloads
        .iter()
        .any(|workload| workload.name.contains(&pipe.id))
}

/// True if some pipeline id is contained in the workload's name.
pub fn workload_in_pipes(workload: &Workload, pipes: &[Pipeline]) -> bool {
    pipes.iter().any(|pipe| workload.name.contains(&pipe.id))
}

/// True if some workload's name contains the serving instance id.
pub fn serving_in_workloads(serving: &ServingInstance, workloads: &[Workload]) -> bool {
    workloads
        .iter()
        .any(|workload| workload.name.contains(&serving.id))
}

/// True if some serving instance id is contained in the workload's name.
pub fn workload_in_servings(workload: &Workload, servings: &[ServingInstance]) -> bool {
    servings
        .iter()
        .any(|serving| workload.name.contains(&serving.id))
}

/// Name of the workload a service routes to: the third segment of its first
/// target id (`<kind>:<namespace>:<name>`).
///
/// Returns `None` when there is no target or the id is not made of exactly
/// three segments.
pub fn target_workload_name(service: &KubeService) -> Option<&str> {
    let mut segments = service.target_workload_ids.first()?.split(':');
    match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(_), Some(name), None) => Some(name),
        _ => None,
    }
}

/// True if a workload named like the service's first target exists.
///
/// A service whose target cannot be read is never matched, so it is reported
/// as orphaned.
pub fn service_in_workloads(service: &KubeService, workloads: &[Workload]) -> bool {
    match target_workload_name(service) {
        Some(name) => workloads.iter().any(|workload| workload.name == name),
        None => false,
    }
}

/// Repartition and changelog topics created for an analytics pipeline.
pub fn is_internal_analytics_topic(topic: &str) -> bool {
    INTERNAL_ANALYTICS_TOPIC.is_match(topic)
}

/// Pipeline reference embedded in a topic name: the full `analytics-<uuid>`
/// match and the bare uuid.
fn pipeline_reference(topic: &str) -> (&str, &str) {
    match PIPELINE_ID_IN_TOPIC.captures(topic) {
        Some(captures) => (
            captures.get(0).map_or("", |m| m.as_str()),
            captures.get(1).map_or("", |m| m.as_str()),
        ),
        None => ("", ""),
    }
}

/// True if a live workload's application id starts with the pipeline
/// reference embedded in the topic name, in either its `analytics-<uuid>`
/// or its bare `<uuid>` form.
pub fn pipeline_exists(topic: &str, envs: &[HashMap<String, String>]) -> bool {
    let (reference, uuid) = pipeline_reference(topic);
    envs.iter()
        .filter_map(|env| env.get(APPLICATION_ID_ENV))
        .any(|app_id| app_id.starts_with(reference) || app_id.starts_with(uuid))
}

/// True if a serving instance writes into the measurement.
pub fn measurement_in_servings(measurement: &str, servings: &[ServingInstance]) -> bool {
    servings
        .iter()
        .any(|serving| serving.measurement == measurement)
}
