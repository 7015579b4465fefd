/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Serving instances of the serving registry and time-series measurements.
//!
//! A serving instance exports one kafka topic into one measurement of the
//! time-series store. Its values are split into data fields and tag fields
//! when the transfer workload is (re)created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServingInstance {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub entity_name: String,
    pub service_name: String,
    pub topic: String,
    pub database: String,
    pub measurement: String,
    pub filter: String,
    pub filter_type: String,
    pub time_path: String,
    pub time_precision: Option<String>,
    pub user_id: String,
    pub rancher_service_id: String,
    pub offset: String,
    pub values: Vec<ServingInstanceValue>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct ServingInstanceValue {
    #[serde(rename = "InstanceID")]
    pub instance_id: String,
    pub name: String,
    pub r#type: String,
    pub path: String,
    pub tag: bool,
}

impl ServingInstance {
    /// Data field mapping as the transfer workload expects it,
    /// e.g. `{"value:float":"value.path"}`.
    pub fn data_fields(&self) -> String {
        Self::render_fields(self.values.iter().filter(|value| !value.tag))
    }

    /// Tag field mapping, same shape as [`ServingInstance::data_fields`].
    pub fn tag_fields(&self) -> String {
        Self::render_fields(self.values.iter().filter(|value| value.tag))
    }

    fn render_fields<'a>(values: impl Iterator<Item = &'a ServingInstanceValue>) -> String {
        let mut map = serde_json::Map::new();
        for value in values {
            map.insert(
                format!("{}:{}", value.name, value.r#type),
                serde_json::Value::String(value.path.clone()),
            );
        }
        serde_json::Value::Object(map).to_string()
    }
}

/// A measurement of the time-series store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfluxMeasurement {
    /// Measurement name
    pub id: String,
    pub database_id: String,
}
