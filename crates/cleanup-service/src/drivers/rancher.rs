/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Rancher 1.x driver. Workloads are the services of the collection's stack;
//! the cattle API has no separate service objects, so service listing is
//! always empty and service deletion does nothing.

use super::{transfer_workload_name, with_trailing_slash, TransferSettings};
use crate::clients::{error_body, ClusterDriver};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_models::models::{Collection, KubeService, ServingInstance, Workload};
use cleanup_utils::config::Rancher;
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceCollection {
    data: Vec<CattleService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CattleService {
    id: String,
    name: String,
    launch_config: LaunchConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LaunchConfig {
    image_uuid: String,
    environment: HashMap<String, String>,
    labels: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceRequest {
    r#type: &'static str,
    name: String,
    stack_id: String,
    scale: u32,
    start_on_create: bool,
    launch_config: LaunchConfig,
}

pub struct RancherDriver {
    client: Client,
    url: String,
    access_key: String,
    secret_key: String,
    pipeline_stack_id: String,
    serving_stack_id: String,
    transfer: TransferSettings,
}

impl RancherDriver {
    pub fn new(config: &Rancher, transfer: TransferSettings) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| CleanupError::Config(format!("rancher client: {}", e)))?;

        Ok(Self {
            client,
            url: with_trailing_slash(&config.url),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            pipeline_stack_id: config.pipeline_stack_id.clone(),
            serving_stack_id: config.serving_stack_id.clone(),
            transfer,
        })
    }

    fn stack_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Pipeline => &self.pipeline_stack_id,
            Collection::Serving => &self.serving_stack_id,
        }
    }

    async fn fetch_services(&self, url: String) -> Result<Vec<CattleService>> {
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let collection: ServiceCollection = response.json().await?;
                Ok(collection.data)
            }
            status => Err(CleanupError::from_status(
                "rancher",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn stack_services(&self, collection: Collection) -> Result<Vec<CattleService>> {
        let url = format!("{}stacks/{}/services", self.url, self.stack_id(collection));
        self.fetch_services(url).await
    }
}

#[async_trait]
impl ClusterDriver for RancherDriver {
    async fn get_workloads(&self, collection: Collection) -> Result<Vec<Workload>> {
        let services = self.stack_services(collection).await?;
        Ok(services
            .into_iter()
            .map(|service| Workload {
                id: service.id,
                name: service.name,
                image_uuid: service.launch_config.image_uuid,
                environment: service.launch_config.environment,
                labels: service.launch_config.labels,
            })
            .collect())
    }

    async fn get_services(&self, _collection: Collection) -> Result<Vec<KubeService>> {
        Ok(Vec::new())
    }

    async fn get_workload_envs(
        &self,
        collection: Collection,
    ) -> Result<Vec<HashMap<String, String>>> {
        let services = self.stack_services(collection).await?;
        Ok(services
            .into_iter()
            .map(|service| service.launch_config.environment)
            .collect())
    }

    async fn delete_workload(&self, name: &str, _collection: Collection) -> Result<()> {
        let url = format!("{}services/?name={}", self.url, name);
        let service = self
            .fetch_services(url)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CleanupError::NotFound(format!("workload {}", name)))?;

        let response = self
            .client
            .delete(format!("{}services/{}", self.url, service.id))
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!("Deleted rancher service {} ({})", name, service.id);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(format!("workload {}", name))),
            status => Err(CleanupError::from_status(
                "rancher",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn delete_service(&self, id: &str, _collection: Collection) -> Result<()> {
        debug!("Rancher 1.x has no kube services, ignoring delete of {}", id);
        Ok(())
    }

    async fn create_serving_instance(
        &self,
        instance: &ServingInstance,
        data_fields: &str,
        tag_fields: &str,
    ) -> Result<String> {
        let environment: HashMap<String, String> = self
            .transfer
            .environment(instance, data_fields, tag_fields)
            .into_iter()
            .collect();
        let labels: BTreeMap<&str, &str> = BTreeMap::from([
            ("io.rancher.container.pull_image", "always"),
            ("io.rancher.scheduler.affinity:host_label", "role=worker"),
        ]);

        let request = CreateServiceRequest {
            r#type: "service",
            name: transfer_workload_name(instance),
            stack_id: self.serving_stack_id.clone(),
            scale: 1,
            start_on_create: true,
            launch_config: LaunchConfig {
                image_uuid: format!("docker:{}", self.transfer.image),
                environment,
                labels: labels
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        };

        let response = self
            .client
            .post(format!("{}services", self.url))
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => {
                let created: CattleService = response.json().await?;
                info!("Created transfer service {} for serving {}", created.id, instance.id);
                Ok(created.id)
            }
            status => Err(CleanupError::from_status(
                "rancher",
                status,
                &error_body(response).await,
            )),
        }
    }
}
