/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Kafka topic administration through the Kafka REST proxy (v3 API), for
//! deployments that expose the proxy instead of the brokers.

use super::{error_body, TopicAdmin};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_utils::config::Kafka;
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ClusterData {
    cluster_id: String,
}

#[derive(Debug, Deserialize)]
struct TopicData {
    topic_name: String,
}

pub struct KafkaRestAdmin {
    client: Client,
    rest_url: String,
    cluster_id: OnceCell<String>,
}

impl KafkaRestAdmin {
    /// Builds the admin client. Every request is bounded by
    /// `admin_timeout_seconds`.
    pub fn new(config: &Kafka) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.admin_timeout_seconds))
            .build()
            .map_err(|e| CleanupError::Config(format!("kafka admin client: {}", e)))?;

        let cluster_id = OnceCell::new();
        if !config.cluster_id.is_empty() {
            // set on a fresh cell cannot fail
            let _ = cluster_id.set(config.cluster_id.clone());
        }

        Ok(Self {
            client,
            rest_url: config.rest_url.trim_end_matches('/').to_string(),
            cluster_id,
        })
    }

    /// Cluster id from configuration, else the first cluster the proxy reports.
    async fn cluster_id(&self) -> Result<&str> {
        let id = self
            .cluster_id
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(format!("{}/v3/clusters", self.rest_url))
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    return Err(CleanupError::from_status(
                        "kafka rest proxy",
                        status,
                        &error_body(response).await,
                    ));
                }
                let clusters: ListResponse<ClusterData> = response.json().await?;
                let cluster = clusters.data.into_iter().next().ok_or_else(|| {
                    CleanupError::Validation("kafka rest proxy reports no cluster".to_string())
                })?;
                info!("Using kafka cluster {}", cluster.cluster_id);
                Ok::<String, CleanupError>(cluster.cluster_id)
            })
            .await?;
        Ok(id.as_str())
    }
}

#[async_trait]
impl TopicAdmin for KafkaRestAdmin {
    async fn get_topics(&self) -> Result<Vec<String>> {
        let url = format!("{}/v3/clusters/{}/topics", self.rest_url, self.cluster_id().await?);
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let topics: ListResponse<TopicData> = response.json().await?;
                Ok(topics.data.into_iter().map(|t| t.topic_name).collect())
            }
            status => Err(CleanupError::from_status(
                "kafka rest proxy",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        let url = format!(
            "{}/v3/clusters/{}/topics/{}",
            self.rest_url,
            self.cluster_id().await?,
            name
        );
        let response = self.client.delete(url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(format!("kafka topic {}", name))),
            status => Err(CleanupError::from_status(
                "kafka rest proxy",
                status,
                &error_body(response).await,
            )),
        }
    }
}
