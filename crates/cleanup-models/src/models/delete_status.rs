/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Progress of the asynchronous kafka topic bulk delete.
///
/// Readers always receive a copy taken under the owner's lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteStatus {
    /// Number of topics selected when the run started
    pub total: usize,
    /// Topics not yet processed
    pub remaining: usize,
    pub running: bool,
    /// One entry per failed topic deletion, plus `aborted` when stopped
    pub errors: Vec<String>,
}

impl DeleteStatus {
    pub fn started(total: usize) -> Self {
        Self {
            total,
            remaining: total,
            running: true,
            errors: Vec::new(),
        }
    }
}
