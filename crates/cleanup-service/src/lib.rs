/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Analytics Cleanup Service
//!
//! Keeps the analytics platform free of leftovers. Pipelines, serving
//! instances, cluster workloads, kube services, internal kafka topics and
//! influx measurements are compared against each other; whatever is no
//! longer backed by its counterpart is reported and can be deleted, and
//! pipelines or serving exports that lost their workload can be recreated.
//!
//! - [`clients`]: collaborator traits and their HTTP implementations
//! - [`drivers`]: the orchestrator backends of [`clients::ClusterDriver`]
//! - [`reconcile`]: matching predicates and the [`reconcile::CleanupService`]
//! - [`api`]: the admin HTTP API

pub mod api;
pub mod cli;
pub mod clients;
pub mod drivers;
pub mod error;
pub mod metrics;
pub mod reconcile;
