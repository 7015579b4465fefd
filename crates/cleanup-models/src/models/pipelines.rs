/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Pipelines as stored by the pipeline registry, and the submission request
//! the flow engine accepts to (re)deploy one.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Deployment type of operators that run outside the cluster.
pub const LOCAL_DEPLOYMENT: &str = "local";

/// Window time the flow engine assumes when a pipeline never set one.
pub const DEFAULT_WINDOW_TIME: i32 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub description: String,
    pub flow_id: String,
    pub image: String,
    pub window_time: Option<i32>,
    pub consume_all_messages: bool,
    pub metrics: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "UserId")]
    pub user_id: String,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub application_id: Option<String>,
    pub image_id: String,
    pub deployment_type: String,
    pub operator_id: String,
    pub config: BTreeMap<String, String>,
    pub output_topic: String,
    pub input_topics: Vec<InputTopic>,
    pub input_selections: Vec<InputSelection>,
    pub persist_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct InputTopic {
    pub name: String,
    pub filter_type: String,
    pub filter_value: String,
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Mapping {
    pub dest: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct InputSelection {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub input_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aspect_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub function_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub characteristic_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub selectable_id: String,
}

impl Pipeline {
    /// True if any operator runs outside the cluster. Such pipelines have no
    /// workload to match against.
    pub fn has_local_operator(&self) -> bool {
        self.operators
            .iter()
            .any(|operator| operator.deployment_type == LOCAL_DEPLOYMENT)
    }

    /// Rebuilds the flow engine submission request from the stored pipeline.
    ///
    /// Every operator becomes a node; input topics become node inputs with
    /// their filter metadata normalized (see [`normalize_filter`]).
    pub fn to_request(&self) -> PipelineRequest {
        let nodes = self
            .operators
            .iter()
            .map(|operator| PipelineNode {
                node_id: operator.id.clone(),
                inputs: operator
                    .input_topics
                    .iter()
                    .map(|topic| {
                        let (filter_type, filter_ids) =
                            normalize_filter(&topic.filter_type, &topic.filter_value, &self.id);
                        NodeInput {
                            filter_type,
                            filter_ids,
                            topic_name: topic.name.clone(),
                            values: topic
                                .mappings
                                .iter()
                                .map(|mapping| NodeValue {
                                    name: mapping.dest.clone(),
                                    path: mapping.source.clone(),
                                })
                                .collect(),
                        }
                    })
                    .collect(),
                config: operator
                    .config
                    .iter()
                    .map(|(name, value)| NodeConfig {
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .collect(),
                input_selections: operator.input_selections.clone(),
                persist_data: operator.persist_data,
            })
            .collect();

        PipelineRequest {
            id: self.id.clone(),
            flow_id: self.flow_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            window_time: self.window_time.unwrap_or(DEFAULT_WINDOW_TIME),
            consume_all_messages: self.consume_all_messages,
            metrics: self.metrics,
            nodes,
        }
    }
}

/// Rewrites legacy filter metadata of a node input.
///
/// `DeviceId`/`OperatorId` become `deviceId`/`operatorId`. An `operatorId`
/// filter value without a `:`-separated pipeline id suffix gets
/// `:<pipeline_id>` appended.
pub fn normalize_filter(filter_type: &str, filter_value: &str, pipeline_id: &str) -> (String, String) {
    let filter_type = match filter_type {
        "DeviceId" => "deviceId",
        "OperatorId" => "operatorId",
        other => other,
    };

    let filter_ids = if filter_type == "operatorId" && !filter_value.contains(':') {
        info!("Pipeline {} uses legacy operatorId filter, fixing now", pipeline_id);
        format!("{}:{}", filter_value, pipeline_id)
    } else {
        filter_value.to_string()
    };

    (filter_type.to_string(), filter_ids)
}

/// Submission request understood by the flow engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineRequest {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub flow_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub window_time: i32,
    pub consume_all_messages: bool,
    pub metrics: bool,
    pub nodes: Vec<PipelineNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineNode {
    pub node_id: String,
    pub inputs: Vec<NodeInput>,
    pub config: Vec<NodeConfig>,
    pub input_selections: Vec<InputSelection>,
    pub persist_data: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeInput {
    pub filter_type: String,
    pub filter_ids: String,
    pub topic_name: String,
    pub values: Vec<NodeValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NodeValue {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    pub value: String,
}
