/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Rancher 2 Driver
//!
//! Talks to the Rancher v3 API. Every collection maps to one project and one
//! namespace; workloads are addressed as `deployment:<namespace>:<name>`.

use super::{transfer_workload_name, with_trailing_slash, TransferSettings};
use crate::clients::{error_body, ClusterDriver};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_models::models::{Collection, KubeService, ServingInstance, Workload};
use cleanup_utils::config::Rancher2;
use cleanup_utils::logging::prelude::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataCollection<T> {
    data: Vec<T>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct R2Workload {
    id: String,
    name: String,
    labels: HashMap<String, String>,
    containers: Vec<R2Container>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct R2Container {
    image: String,
    name: String,
    env: Vec<R2Env>,
    #[serde(skip_serializing_if = "String::is_empty")]
    image_pull_policy: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct R2Env {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct R2Service {
    id: String,
    name: String,
    base_type: String,
    target_workload_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWorkloadRequest {
    name: String,
    namespace_id: String,
    containers: Vec<R2Container>,
    labels: HashMap<String, String>,
    selector: serde_json::Value,
    scheduling: serde_json::Value,
}

impl R2Container {
    fn env_map(&self) -> HashMap<String, String> {
        self.env
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect()
    }
}

pub struct Rancher2Driver {
    client: Client,
    url: String,
    access_key: String,
    secret_key: String,
    pipeline_project_id: String,
    pipeline_namespace_id: String,
    serving_project_id: String,
    serving_namespace_id: String,
    transfer: TransferSettings,
}

impl Rancher2Driver {
    pub fn new(config: &Rancher2, transfer: TransferSettings) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| CleanupError::Config(format!("rancher2 client: {}", e)))?;

        Ok(Self {
            client,
            url: with_trailing_slash(&config.url),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            pipeline_project_id: config.pipeline_project_id.clone(),
            pipeline_namespace_id: config.pipeline_namespace_id.clone(),
            serving_project_id: config.serving_project_id.clone(),
            serving_namespace_id: config.serving_namespace_id.clone(),
            transfer,
        })
    }

    /// Project and namespace of a collection.
    fn scope(&self, collection: Collection) -> (&str, &str) {
        match collection {
            Collection::Pipeline => (&self.pipeline_project_id, &self.pipeline_namespace_id),
            Collection::Serving => (&self.serving_project_id, &self.serving_namespace_id),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T> {
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => Err(CleanupError::from_status(
                "rancher2",
                status,
                &error_body(response).await,
            )),
        }
    }

    async fn list_workloads(&self, collection: Collection) -> Result<Vec<R2Workload>> {
        let (project, namespace) = self.scope(collection);
        let url = format!(
            "{}projects/{}/workloads/?namespaceId={}",
            self.url, project, namespace
        );
        let workloads: DataCollection<R2Workload> = self.get(url).await?;
        Ok(workloads.data)
    }

    async fn delete(&self, url: String, what: String) -> Result<()> {
        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(CleanupError::NotFound(what)),
            status => Err(CleanupError::from_status(
                "rancher2",
                status,
                &error_body(response).await,
            )),
        }
    }
}

#[async_trait]
impl ClusterDriver for Rancher2Driver {
    async fn get_workloads(&self, collection: Collection) -> Result<Vec<Workload>> {
        let workloads = self.list_workloads(collection).await?;
        Ok(workloads
            .into_iter()
            .map(|workload| {
                let first = workload.containers.first();
                Workload {
                    id: workload.id,
                    name: workload.name,
                    image_uuid: first.map(|c| c.image.clone()).unwrap_or_default(),
                    environment: first.map(R2Container::env_map).unwrap_or_default(),
                    labels: workload.labels,
                }
            })
            .collect())
    }

    async fn get_services(&self, collection: Collection) -> Result<Vec<KubeService>> {
        let (project, namespace) = self.scope(collection);
        let url = format!(
            "{}projects/{}/services/?limit=2000&namespaceId={}",
            self.url, project, namespace
        );
        let services: DataCollection<R2Service> = self.get(url).await?;
        Ok(services
            .data
            .into_iter()
            .map(|service| KubeService {
                id: service.id,
                base_type: service.base_type,
                name: service.name,
                target_workload_ids: service.target_workload_ids,
            })
            .collect())
    }

    async fn get_workload_envs(
        &self,
        collection: Collection,
    ) -> Result<Vec<HashMap<String, String>>> {
        let workloads = self.list_workloads(collection).await?;
        Ok(workloads
            .iter()
            .flat_map(|workload| workload.containers.iter().map(R2Container::env_map))
            .collect())
    }

    async fn delete_workload(&self, name: &str, collection: Collection) -> Result<()> {
        let (project, namespace) = self.scope(collection);
        let url = format!(
            "{}projects/{}/workloads/deployment:{}:{}",
            self.url, project, namespace, name
        );
        self.delete(url, format!("workload {}", name)).await?;
        info!("Deleted {} workload {}", collection, name);
        Ok(())
    }

    async fn delete_service(&self, id: &str, collection: Collection) -> Result<()> {
        let (project, _) = self.scope(collection);
        let url = format!("{}projects/{}/services/{}", self.url, project, id);
        self.delete(url, format!("service {}", id)).await?;
        info!("Deleted {} service {}", collection, id);
        Ok(())
    }

    async fn create_serving_instance(
        &self,
        instance: &ServingInstance,
        data_fields: &str,
        tag_fields: &str,
    ) -> Result<String> {
        let env = self
            .transfer
            .environment(instance, data_fields, tag_fields)
            .into_iter()
            .map(|(name, value)| R2Env { name, value })
            .collect();
        let labels = HashMap::from([("exportId".to_string(), instance.id.clone())]);

        let request = CreateWorkloadRequest {
            name: transfer_workload_name(instance),
            namespace_id: self.serving_namespace_id.clone(),
            containers: vec![R2Container {
                image: self.transfer.image.clone(),
                name: "kafka2influx".to_string(),
                env,
                image_pull_policy: "Always".to_string(),
            }],
            selector: serde_json::json!({"matchLabels": labels}),
            labels,
            scheduling: serde_json::json!({
                "scheduler": "default-scheduler",
                "node": {"requireAll": ["role=worker"]}
            }),
        };

        let response = self
            .client
            .post(format!("{}projects/{}/workloads", self.url, self.serving_project_id))
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => {
                let created: R2Workload = response.json().await?;
                info!("Created transfer workload {} for serving {}", created.id, instance.id);
                Ok(created.id)
            }
            status => Err(CleanupError::from_status(
                "rancher2",
                status,
                &error_body(response).await,
            )),
        }
    }
}
