/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Workloads Module
//!
//! Cluster resources as reported by the orchestrator drivers.
//!
//! ## Core Data Model
//!
//! - `Workload`: a running deployment in one of the analytics namespaces
//! - `KubeService`: a network service routing to workloads
//! - `Collection`: which namespace (pipelines or servings) a query targets
//!
//! Driver specific payloads are mapped to these types inside each driver,
//! the reconciler only ever sees the types defined here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

/// A deployment running in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Workload {
    /// Orchestrator specific identifier
    pub id: String,
    /// Workload name; pipeline workloads carry the pipeline id in it
    pub name: String,
    /// Container image the workload runs
    pub image_uuid: String,
    /// Container environment
    pub environment: HashMap<String, String>,
    /// Workload labels
    pub labels: HashMap<String, String>,
}

/// A network service of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct KubeService {
    pub id: String,
    pub base_type: String,
    pub name: String,
    /// Targets in `<kind>:<namespace>:<workload-name>` form
    pub target_workload_ids: Vec<String>,
}

/// Namespace group of cluster resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Pipeline,
    Serving,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Pipeline => "pipeline",
            Collection::Serving => "serving",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
