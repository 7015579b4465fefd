/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Error Module
//!
//! Error kinds of the reconciler and its collaborators.
//!
//! | Kind         | Meaning                                         | HTTP |
//! |--------------|-------------------------------------------------|------|
//! | `NotFound`   | the resource is already absent upstream         | 404  |
//! | `Conflict`   | bulk delete already running / not running       | 409  |
//! | `Upstream`   | a collaborator call failed or returned non-2xx  | 500  |
//! | `Validation` | a collaborator returned an undecodable body     | 500  |
//! | `Config`     | the service could not be configured             | 500  |
//!
//! Responses only carry a generic message; the detailed error is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cleanup_utils::logging::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("invalid upstream response: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CleanupError>;

impl CleanupError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CleanupError::NotFound(_) => StatusCode::NOT_FOUND,
            CleanupError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CleanupError::NotFound(_))
    }

    /// Builds an `Upstream` error from a non-2xx response.
    pub fn from_status(action: &str, status: reqwest::StatusCode, body: &str) -> Self {
        CleanupError::Upstream(format!("{} returned {}: {}", action, status, body))
    }

    fn public_message(&self) -> &'static str {
        match self {
            CleanupError::NotFound(_) => "Resource not found",
            CleanupError::Conflict(_) => "Operation conflicts with the current state",
            _ => "Internal server error",
        }
    }
}

impl From<reqwest::Error> for CleanupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CleanupError::Validation(e.to_string())
        } else {
            CleanupError::Upstream(e.to_string())
        }
    }
}

impl From<kube::Error> for CleanupError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ref response) if response.code == 404 => {
                CleanupError::NotFound(response.message.clone())
            }
            kube::Error::SerdeError(ref inner) => CleanupError::Validation(inner.to_string()),
            other => CleanupError::Upstream(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CleanupError {
    fn from(e: serde_json::Error) -> Self {
        CleanupError::Validation(e.to_string())
    }
}

impl IntoResponse for CleanupError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (
            status,
            Json(serde_json::json!({"error": self.public_message()})),
        )
            .into_response()
    }
}
