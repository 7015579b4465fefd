/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use super::{error_body, ServingRegistry};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_models::models::ServingInstance;
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};

/// Client of the serving registry's admin endpoints.
#[derive(Clone)]
pub struct ServingRegistryClient {
    client: Client,
    url: String,
}

impl ServingRegistryClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ServingRegistry for ServingRegistryClient {
    async fn get_serving_services(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<ServingInstance>> {
        let response = self
            .client
            .get(format!("{}/admin/instance", self.url))
            .header("X-UserId", user_id)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(CleanupError::from_status(
                "serving registry",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn delete_serving_service(
        &self,
        id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/admin/instance/{}", self.url, id))
            .header("X-UserId", user_id)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => {
                info!("Deleted serving instance {}", id);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(format!("serving instance {}", id))),
            status => Err(CleanupError::from_status(
                "serving registry",
                status,
                &error_body(response).await,
            )),
        }
    }
}
