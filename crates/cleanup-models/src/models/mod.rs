//! Data models shared by the cleanup service and its API
pub mod delete_status;
pub mod pipelines;
pub mod servings;
pub mod workloads;

pub use delete_status::DeleteStatus;
pub use pipelines::{
    InputSelection, InputTopic, Mapping, NodeConfig, NodeInput, NodeValue, Operator, Pipeline,
    PipelineNode, PipelineRequest,
};
pub use servings::{InfluxMeasurement, ServingInstance, ServingInstanceValue};
pub use workloads::{Collection, KubeService, Workload};
