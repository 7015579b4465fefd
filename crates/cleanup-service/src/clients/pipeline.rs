/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Pipeline registry and flow engine client.
//!
//! Listing and deleting go to the registry's admin endpoints, resubmission
//! goes to the flow engine under the owner's identity.

use super::{error_body, PipelineRegistry};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_models::models::{Pipeline, PipelineRequest};
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const ENGINE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PipelineRegistryClient {
    client: Client,
    registry_url: String,
    engine_url: String,
}

impl PipelineRegistryClient {
    pub fn new(registry_url: &str, engine_url: &str) -> Self {
        Self {
            client: Client::new(),
            registry_url: registry_url.trim_end_matches('/').to_string(),
            engine_url: engine_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PipelineRegistry for PipelineRegistryClient {
    async fn get_pipelines(&self, user_id: &str, access_token: &str) -> Result<Vec<Pipeline>> {
        let url = format!("{}/admin/pipeline", self.registry_url);
        debug!("Fetching pipelines from {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-UserId", user_id)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let pipelines: Vec<Pipeline> = response.json().await?;
                debug!("Pipeline registry returned {} pipelines", pipelines.len());
                Ok(pipelines)
            }
            status => Err(CleanupError::from_status(
                "pipeline registry",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn delete_pipeline(&self, id: &str, access_token: &str) -> Result<()> {
        let url = format!("{}/admin/pipeline/{}", self.registry_url, id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!("Deleted pipeline {} from registry", id);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(format!("pipeline {}", id))),
            status => Err(CleanupError::from_status(
                "pipeline registry",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn create_pipeline(
        &self,
        request: &PipelineRequest,
        user_id: &str,
        user_token: &str,
    ) -> Result<()> {
        let url = format!("{}/pipeline", self.engine_url);
        info!("Submitting pipeline {} ({}) to flow engine", request.id, request.name);

        let response = self
            .client
            .put(&url)
            .timeout(ENGINE_TIMEOUT)
            .header("X-UserId", user_id)
            .bearer_auth(user_token)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(CleanupError::from_status(
                "flow engine",
                status,
                &error_body(response).await,
            )),
        }
    }
}
