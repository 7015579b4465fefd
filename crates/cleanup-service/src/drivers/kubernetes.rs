/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Kubernetes Driver
//!
//! Reads Deployments and Services straight from the Kubernetes API.
//!
//! Workload ids use the rancher form `deployment:<namespace>:<name>` so the
//! kube-service matching works unchanged. A Service's targets come from the
//! `field.cattle.io/targetWorkloadIds` annotation when present (clusters that
//! were managed by rancher), else from its `app` selector label.

use super::{transfer_workload_name, TransferSettings};
use crate::clients::ClusterDriver;
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use cleanup_models::models::{Collection, KubeService, ServingInstance, Workload};
use cleanup_utils::config::Kubernetes;
use cleanup_utils::logging::prelude::*;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Service};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Error as KubeError, ResourceExt};
use std::collections::HashMap;
use std::time::Duration;

/// Annotation rancher writes on services it manages.
pub const TARGET_WORKLOADS_ANNOTATION: &str = "field.cattle.io/targetWorkloadIds";

/// Retry configuration for list calls
struct RetryConfig {
    max_elapsed_time: Duration,
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_elapsed_time: Duration::from_secs(30),
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

fn is_retryable_error(error: &KubeError) -> bool {
    match error {
        KubeError::Api(api_err) => {
            matches!(api_err.code, 429 | 500 | 503 | 504)
                || matches!(
                    api_err.reason.as_str(),
                    "ServiceUnavailable" | "InternalError" | "Timeout"
                )
        }
        _ => false,
    }
}

async fn with_retries<F, Fut, T>(operation: F, config: RetryConfig) -> std::result::Result<T, KubeError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, KubeError>>,
{
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(config.initial_interval)
        .with_max_interval(config.max_interval)
        .with_multiplier(config.multiplier)
        .with_max_elapsed_time(Some(config.max_elapsed_time))
        .build();

    backoff::future::retry(backoff, || async {
        operation().await.map_err(|error| {
            if is_retryable_error(&error) {
                warn!("Retryable kubernetes error: {}", error);
                backoff::Error::transient(error)
            } else {
                backoff::Error::permanent(error)
            }
        })
    })
    .await
}

pub struct KubernetesDriver {
    client: Client,
    pipeline_namespace: String,
    serving_namespace: String,
    transfer: TransferSettings,
}

impl KubernetesDriver {
    /// Connects using the given kubeconfig, or in-cluster/default config.
    pub async fn connect(config: &Kubernetes, transfer: TransferSettings) -> Result<Self> {
        let client = match config.kubeconfig_path.as_deref() {
            Some(path) => {
                let kubeconfig = kube::config::Kubeconfig::read_from(path)
                    .map_err(|e| CleanupError::Config(format!("kubeconfig {}: {}", path, e)))?;
                let options = kube::config::KubeConfigOptions::default();
                let client_config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| CleanupError::Config(format!("kubeconfig {}: {}", path, e)))?;
                Client::try_from(client_config)
            }
            None => Client::try_default().await,
        }
        .map_err(|e| CleanupError::Config(format!("kubernetes client: {}", e)))?;

        info!("Connected to kubernetes cluster");
        Ok(Self::with_client(client, config, transfer))
    }

    pub fn with_client(client: Client, config: &Kubernetes, transfer: TransferSettings) -> Self {
        Self {
            client,
            pipeline_namespace: config.pipeline_namespace.clone(),
            serving_namespace: config.serving_namespace.clone(),
            transfer,
        }
    }

    fn namespace(&self, collection: Collection) -> &str {
        match collection {
            Collection::Pipeline => &self.pipeline_namespace,
            Collection::Serving => &self.serving_namespace,
        }
    }

    async fn list_deployments(&self, collection: Collection) -> Result<Vec<Deployment>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), self.namespace(collection));
        let params = ListParams::default();
        let list = with_retries(|| api.list(&params), RetryConfig::default()).await?;
        Ok(list.items)
    }
}

fn containers(deployment: &Deployment) -> &[Container] {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|pod| pod.containers.as_slice())
        .unwrap_or_default()
}

fn container_env(container: &Container) -> HashMap<String, String> {
    container
        .env
        .iter()
        .flatten()
        .map(|var| (var.name.clone(), var.value.clone().unwrap_or_default()))
        .collect()
}

fn to_workload(namespace: &str, deployment: &Deployment) -> Workload {
    let name = deployment.name_any();
    let first = containers(deployment).first();
    Workload {
        id: format!("deployment:{}:{}", namespace, name),
        image_uuid: first.and_then(|c| c.image.clone()).unwrap_or_default(),
        environment: first.map(container_env).unwrap_or_default(),
        labels: deployment.labels().clone().into_iter().collect(),
        name,
    }
}

/// Target workload ids of a service, see the module docs.
fn service_targets(namespace: &str, service: &Service) -> Vec<String> {
    if let Some(raw) = service.annotations().get(TARGET_WORKLOADS_ANNOTATION) {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(ids) => return ids,
            Err(e) => warn!(
                "Service {} has malformed {} annotation: {}",
                service.name_any(),
                TARGET_WORKLOADS_ANNOTATION,
                e
            ),
        }
    }

    service
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
        .and_then(|selector| selector.get("app"))
        .map(|app| vec![format!("deployment:{}:{}", namespace, app)])
        .unwrap_or_default()
}

fn to_kube_service(namespace: &str, service: &Service) -> KubeService {
    KubeService {
        id: service.name_any(),
        base_type: "service".to_string(),
        name: service.name_any(),
        target_workload_ids: service_targets(namespace, service),
    }
}

#[async_trait]
impl ClusterDriver for KubernetesDriver {
    async fn get_workloads(&self, collection: Collection) -> Result<Vec<Workload>> {
        let namespace = self.namespace(collection);
        let deployments = self.list_deployments(collection).await?;
        Ok(deployments
            .iter()
            .map(|deployment| to_workload(namespace, deployment))
            .collect())
    }

    async fn get_services(&self, collection: Collection) -> Result<Vec<KubeService>> {
        let namespace = self.namespace(collection);
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default();
        let list = with_retries(|| api.list(&params), RetryConfig::default()).await?;
        Ok(list
            .items
            .iter()
            .map(|service| to_kube_service(namespace, service))
            .collect())
    }

    async fn get_workload_envs(
        &self,
        collection: Collection,
    ) -> Result<Vec<HashMap<String, String>>> {
        let deployments = self.list_deployments(collection).await?;
        Ok(deployments
            .iter()
            .flat_map(|deployment| containers(deployment).iter().map(container_env))
            .collect())
    }

    async fn delete_workload(&self, name: &str, collection: Collection) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), self.namespace(collection));
        api.delete(name, &DeleteParams::default()).await?;
        info!("Deleted {} deployment {}", collection, name);
        Ok(())
    }

    async fn delete_service(&self, id: &str, collection: Collection) -> Result<()> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), self.namespace(collection));
        api.delete(id, &DeleteParams::default()).await?;
        info!("Deleted {} service {}", collection, id);
        Ok(())
    }

    async fn create_serving_instance(
        &self,
        instance: &ServingInstance,
        data_fields: &str,
        tag_fields: &str,
    ) -> Result<String> {
        let namespace = self.namespace(Collection::Serving);
        let name = transfer_workload_name(instance);
        let env: Vec<serde_json::Value> = self
            .transfer
            .environment(instance, data_fields, tag_fields)
            .into_iter()
            .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
            .collect();

        let deployment: Deployment = serde_json::from_value(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": {"exportId": instance.id}
            },
            "spec": {
                "replicas": 1,
                "selector": {"matchLabels": {"exportId": instance.id}},
                "template": {
                    "metadata": {"labels": {"exportId": instance.id}},
                    "spec": {
                        "containers": [{
                            "name": "kafka2influx",
                            "image": self.transfer.image,
                            "imagePullPolicy": "Always",
                            "env": env
                        }]
                    }
                }
            }
        }))?;

        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let created = api.create(&PostParams::default(), &deployment).await?;
        info!("Created transfer deployment {} for serving {}", created.name_any(), instance.id);
        Ok(format!("deployment:{}:{}", namespace, created.name_any()))
    }
}
