/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Collaborator Clients
//!
//! Narrow interfaces of the services the reconciler talks to, and their HTTP
//! implementations. The cluster side lives in [`crate::drivers`].
//!
//! | Trait              | Implementation           | Backend                      |
//! |--------------------|--------------------------|------------------------------|
//! | `PipelineRegistry` | `PipelineRegistryClient` | pipeline registry + engine   |
//! | `ServingRegistry`  | `ServingRegistryClient`  | serving registry             |
//! | `IdentityProvider` | `KeycloakClient`         | Keycloak                     |
//! | `TopicAdmin`       | `KafkaAdmin`             | Kafka brokers (admin API)    |
//! | `TopicAdmin`       | `KafkaRestAdmin`         | Kafka REST proxy v3          |
//! | `MeasurementStore` | `InfluxClient`           | InfluxDB 1.x query API       |

pub mod influx;
pub mod kafka;
pub mod kafka_rest;
pub mod keycloak;
pub mod pipeline;
pub mod serving;

use crate::error::Result;
use async_trait::async_trait;
use cleanup_models::models::{
    Collection, KubeService, Pipeline, PipelineRequest, ServingInstance, Workload,
};
use cleanup_utils::config::{Kafka, TopicAdminKind};
use cleanup_utils::logging::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub use influx::InfluxClient;
pub use kafka::KafkaAdmin;
pub use kafka_rest::KafkaRestAdmin;
pub use keycloak::{KeycloakClient, User, UserInfo};
pub use pipeline::PipelineRegistryClient;
pub use serving::ServingRegistryClient;

/// Orchestrator abstraction, one implementation per orchestrator generation.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    async fn get_workloads(&self, collection: Collection) -> Result<Vec<Workload>>;

    async fn get_services(&self, collection: Collection) -> Result<Vec<KubeService>>;

    /// Environment of every container of the collection's workloads.
    async fn get_workload_envs(&self, collection: Collection)
        -> Result<Vec<HashMap<String, String>>>;

    /// Deletes a workload by name. An absent workload is `NotFound`.
    async fn delete_workload(&self, name: &str, collection: Collection) -> Result<()>;

    async fn delete_service(&self, id: &str, collection: Collection) -> Result<()>;

    /// Creates the transfer workload of a serving instance and returns its id.
    async fn create_serving_instance(
        &self,
        instance: &ServingInstance,
        data_fields: &str,
        tag_fields: &str,
    ) -> Result<String>;
}

#[async_trait]
pub trait PipelineRegistry: Send + Sync {
    async fn get_pipelines(&self, user_id: &str, access_token: &str) -> Result<Vec<Pipeline>>;

    async fn delete_pipeline(&self, id: &str, access_token: &str) -> Result<()>;

    /// Submits a pipeline to the flow engine on behalf of `user_id`.
    async fn create_pipeline(
        &self,
        request: &PipelineRequest,
        user_id: &str,
        user_token: &str,
    ) -> Result<()>;
}

#[async_trait]
pub trait ServingRegistry: Send + Sync {
    async fn get_serving_services(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Vec<ServingInstance>>;

    async fn delete_serving_service(&self, id: &str, user_id: &str, access_token: &str)
        -> Result<()>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user_info(&self) -> Result<UserInfo>;

    async fn get_user_by_id(&self, id: &str) -> Result<User>;

    /// Token issued on behalf of `user_id`.
    async fn get_impersonate_token(&self, user_id: &str) -> Result<String>;

    /// Access token of the service account.
    async fn get_access_token(&self) -> String;
}

#[async_trait]
pub trait TopicAdmin: Send + Sync {
    async fn get_topics(&self) -> Result<Vec<String>>;

    /// Deletes a topic. An unknown topic is `NotFound`.
    async fn delete_topic(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn get_measurements(&self, database: &str) -> Result<Vec<String>>;

    async fn drop_measurement(&self, database: &str, measurement: &str) -> Result<()>;
}

/// Reads the body of a failed response for error reporting.
/// Builds the configured topic admin.
pub fn build_topic_admin(config: &Kafka) -> Result<Arc<dyn TopicAdmin>> {
    let admin: Arc<dyn TopicAdmin> = match config.kind {
        TopicAdminKind::Native => Arc::new(KafkaAdmin::new(config)?),
        TopicAdminKind::Rest => Arc::new(KafkaRestAdmin::new(config)?),
    };
    info!("Using {:?} kafka topic admin", config.kind);
    Ok(admin)
}

pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}
