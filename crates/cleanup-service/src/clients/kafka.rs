/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Kafka topic administration over the broker protocol.
//!
//! Topics are listed from cluster metadata and deleted with the admin API of
//! the brokers in `kafka.bootstrap`. Both calls are bounded by
//! `kafka.admin_timeout_seconds`.

use super::TopicAdmin;
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_utils::config::Kafka;
use cleanup_utils::logging::prelude::*;
use rdkafka::admin::{AdminClient, AdminOptions, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::sync::Arc;
use std::time::Duration;

const CLIENT_ID: &str = "analytics-cleanup";

pub struct KafkaAdmin {
    admin: Arc<AdminClient<DefaultClientContext>>,
    timeout: Duration,
}

impl KafkaAdmin {
    /// Creates the admin client. No broker is contacted until the first call.
    pub fn new(config: &Kafka) -> Result<Self> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap)
            .set("client.id", CLIENT_ID)
            .create()
            .map_err(|e| CleanupError::Config(format!("kafka admin client: {}", e)))?;

        info!("Kafka admin client bootstrapping from {}", config.bootstrap);
        Ok(Self {
            admin: Arc::new(admin),
            timeout: Duration::from_secs(config.admin_timeout_seconds),
        })
    }
}

#[async_trait]
impl TopicAdmin for KafkaAdmin {
    async fn get_topics(&self) -> Result<Vec<String>> {
        let admin = self.admin.clone();
        let timeout = self.timeout;
        // metadata requests block the calling thread
        tokio::task::spawn_blocking(move || {
            let metadata = admin.inner().fetch_metadata(None, timeout)?;
            Ok::<Vec<String>, KafkaError>(
                metadata
                    .topics()
                    .iter()
                    .map(|topic| topic.name().to_string())
                    .collect(),
            )
        })
        .await
        .map_err(|e| CleanupError::Upstream(format!("kafka metadata task: {}", e)))?
        .map_err(|e| CleanupError::Upstream(format!("kafka metadata: {}", e)))
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        let options = AdminOptions::new()
            .request_timeout(Some(self.timeout))
            .operation_timeout(Some(self.timeout));

        let results = self
            .admin
            .delete_topics(&[name], &options)
            .await
            .map_err(|e| admin_error(name, e))?;

        results.into_iter().try_for_each(topic_result)
    }
}

fn topic_result(result: TopicResult) -> Result<()> {
    result.map(|_| ()).map_err(|(topic, code)| topic_error(&topic, code))
}

fn admin_error(topic: &str, error: KafkaError) -> CleanupError {
    match error.rdkafka_error_code() {
        Some(code) => topic_error(topic, code),
        None => CleanupError::Upstream(format!("kafka admin: {}", error)),
    }
}

/// Unknown topics are `NotFound`; every other broker error is `Upstream`.
fn topic_error(topic: &str, code: RDKafkaErrorCode) -> CleanupError {
    match code {
        RDKafkaErrorCode::UnknownTopicOrPartition | RDKafkaErrorCode::UnknownTopic => {
            CleanupError::NotFound(format!("kafka topic {}", topic))
        }
        code => CleanupError::Upstream(format!("kafka topic {}: {}", topic, code)),
    }
}
