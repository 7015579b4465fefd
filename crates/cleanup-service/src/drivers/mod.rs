/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cluster Drivers
//!
//! Implementations of [`ClusterDriver`] for the supported orchestrators.
//! The driver is picked once at startup from `driver.kind`; nothing after
//! construction knows which orchestrator it talks to.
//!
//! - `rancher`: Rancher 1.x (cattle) stacks and services
//! - `rancher2`: Rancher 2.x project/namespace scoped workloads
//! - `kubernetes`: Deployments and Services through the Kubernetes API

pub mod kubernetes;
pub mod rancher;
pub mod rancher2;

use crate::clients::ClusterDriver;
use crate::error::Result;
use cleanup_models::models::ServingInstance;
use cleanup_utils::config::{DriverKind, Settings};
use cleanup_utils::logging::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use kubernetes::KubernetesDriver;
pub use rancher::RancherDriver;
pub use rancher2::Rancher2Driver;

/// Builds the configured driver.
pub async fn build_driver(settings: &Settings) -> Result<Arc<dyn ClusterDriver>> {
    let transfer = TransferSettings::from_settings(settings);
    let driver: Arc<dyn ClusterDriver> = match settings.driver.kind {
        DriverKind::Rancher => Arc::new(RancherDriver::new(&settings.driver.rancher, transfer)?),
        DriverKind::Rancher2 => {
            Arc::new(Rancher2Driver::new(&settings.driver.rancher2, transfer)?)
        }
        DriverKind::Kubernetes => {
            Arc::new(KubernetesDriver::connect(&settings.driver.kubernetes, transfer).await?)
        }
    };
    info!("Using {:?} cluster driver", settings.driver.kind);
    Ok(driver)
}

/// Settings of the kafka-to-influx transfer workload backing a serving instance.
#[derive(Debug, Clone, Default)]
pub struct TransferSettings {
    pub image: String,
    pub kafka_bootstrap: String,
    pub influx_host: String,
    pub influx_port: String,
    pub influx_user: String,
    pub influx_password: String,
}

impl TransferSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            image: settings.serving.transfer_image.clone(),
            kafka_bootstrap: settings.serving.kafka_bootstrap.clone(),
            influx_host: settings.serving.influx_host.clone(),
            influx_port: settings.serving.influx_port.clone(),
            influx_user: settings.influx.user.clone(),
            influx_password: settings.influx.password.clone(),
        }
    }

    /// Environment of the transfer container.
    pub fn environment(
        &self,
        instance: &ServingInstance,
        data_fields: &str,
        tag_fields: &str,
    ) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("KAFKA_GROUP_ID".into(), format!("transfer-{}", instance.id));
        env.insert("KAFKA_BOOTSTRAP".into(), self.kafka_bootstrap.clone());
        env.insert("KAFKA_TOPIC".into(), instance.topic.clone());
        env.insert("DATA_MEASUREMENT".into(), instance.measurement.clone());
        env.insert("DATA_FIELDS_MAPPING".into(), data_fields.to_string());
        env.insert("DATA_TAGS_MAPPING".into(), tag_fields.to_string());
        env.insert("DATA_TIME_MAPPING".into(), instance.time_path.clone());
        env.insert("DATA_FILTER_ID".into(), instance.filter.clone());
        env.insert("INFLUX_DB".into(), instance.database.clone());
        env.insert("INFLUX_HOST".into(), self.influx_host.clone());
        env.insert("INFLUX_PORT".into(), self.influx_port.clone());
        env.insert("INFLUX_USER".into(), self.influx_user.clone());
        env.insert("INFLUX_PW".into(), self.influx_password.clone());
        env.insert("OFFSET_RESET".into(), instance.offset.clone());

        if let Some(precision) = instance.time_precision.as_deref().filter(|p| !p.is_empty()) {
            env.insert("TIME_PRECISION".into(), precision.to_string());
        }
        match instance.filter_type.as_str() {
            "operatorId" => {
                env.insert("DATA_FILTER_ID_MAPPING".into(), "operator_id".into());
            }
            "import_id" => {
                env.insert("DATA_FILTER_ID_MAPPING".into(), "import_id".into());
            }
            _ => {}
        }
        env
    }
}

/// Workload name of a serving instance's transfer container.
pub fn transfer_workload_name(instance: &ServingInstance) -> String {
    format!("kafka2influx-{}", instance.id)
}

/// Rancher URLs are joined by plain concatenation, so keep exactly one
/// trailing slash.
pub(crate) fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}
