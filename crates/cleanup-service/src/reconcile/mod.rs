/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Reconciliation
//!
//! Compares what the registries say should exist with what the cluster,
//! kafka and influx actually hold, and removes or recreates the difference.
//!
//! - [`matching`]: the name based predicates deciding whether an entity is represented
//! - [`service`]: [`CleanupService`], the detection, deletion and recreation operations

pub mod matching;
pub mod service;

pub use service::{CleanupOptions, CleanupService, Collaborators};
