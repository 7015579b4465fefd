/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cleanup Config Module
//!
//! Layered configuration for the analytics cleanup service.
//!
//! Values are resolved in this order, later sources winning:
//!
//! 1. The embedded `default.toml`
//! 2. An optional configuration file passed on the command line
//! 3. Environment variables prefixed with `CLEANUP__`, using `__` as the
//!    section separator (e.g. `CLEANUP__KAFKA__BOOTSTRAP`,
//!    `CLEANUP__DRIVER__RANCHER2__ACCESS_KEY`)
//!
//! Frequently used variables:
//!
//! - `CLEANUP__LOG__LEVEL`: "trace", "debug", "info", "warn", "error". Default: "info"
//! - `CLEANUP__MODE`: "web" serves the admin API, "once" runs a single cleanup pass
//! - `CLEANUP__DRIVER__KIND`: "rancher", "rancher2" or "kubernetes". Default: "rancher2"
//! - `CLEANUP__KAFKA__KIND`: "native" (broker admin protocol) or "rest". Default: "native"
//! - `CLEANUP__KAFKA__ADMIN_TIMEOUT_SECONDS`: topic admin request timeout. Default: 25
//! - `CLEANUP__CLEANUP__KAFKA_DELETE_INTERVAL_MS`: pause between topic deletions. Default: 1000

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const DEFAULT_SETTINGS: &str = include_str!("../default.toml");

/// Main settings structure for the service
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Run mode
    pub mode: Mode,
    /// Recreate pipelines without workloads when a cleanup pass runs
    pub recreate_pipelines: bool,
    /// Recreate transfer workloads of serving instances during a cleanup pass
    #[serde(default)]
    pub recreate_servings: bool,
    pub log: Log,
    pub server: Server,
    pub cors: Cors,
    pub keycloak: Keycloak,
    pub pipeline: Pipeline,
    pub serving: Serving,
    pub kafka: Kafka,
    pub influx: Influx,
    pub cleanup: Cleanup,
    pub driver: Driver,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Serve the admin HTTP API
    Web,
    /// Run one cleanup pass and exit
    Once,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,
    /// Log format: "text" for human-readable, "json" for structured JSON
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub port: u16,
    /// Path prefix under which all admin routes are mounted
    #[serde(default)]
    pub url_prefix: String,
}

/// CORS configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_seconds: u64,
}

/// Identity provider (Keycloak) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Keycloak {
    pub url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    pub user: String,
    pub password: String,
}

/// Pipeline registry and flow engine endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct Pipeline {
    pub registry_url: String,
    pub engine_url: String,
}

/// Serving registry endpoint and transfer workload settings
#[derive(Debug, Deserialize, Clone)]
pub struct Serving {
    pub registry_url: String,
    pub transfer_image: String,
    pub kafka_bootstrap: String,
    pub influx_host: String,
    pub influx_port: String,
}

/// Kafka topic admin configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Kafka {
    pub kind: TopicAdminKind,
    /// Broker list used by the native admin client
    pub bootstrap: String,
    /// REST proxy base url, used with `kind = "rest"`
    pub rest_url: String,
    /// Cluster id; resolved from the proxy when empty
    #[serde(default)]
    pub cluster_id: String,
    pub admin_timeout_seconds: u64,
}

/// How topics are administered
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TopicAdminKind {
    /// Kafka admin protocol against the brokers
    #[default]
    Native,
    /// Confluent REST proxy v3
    Rest,
}

/// Time-series store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Influx {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Upper bound for drop-and-verify rounds of a forced measurement delete
    pub max_drop_attempts: u32,
    pub drop_retry_interval_ms: u64,
}

/// Reconciler tuning
#[derive(Debug, Deserialize, Clone)]
pub struct Cleanup {
    /// Pause between two kafka topic deletions of a bulk delete run
    pub kafka_delete_interval_ms: u64,
}

/// Orchestrator driver selection, chosen once at startup
#[derive(Debug, Deserialize, Clone)]
pub struct Driver {
    pub kind: DriverKind,
    pub rancher: Rancher,
    pub rancher2: Rancher2,
    pub kubernetes: Kubernetes,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Rancher,
    Rancher2,
    Kubernetes,
}

/// Rancher 1.x (cattle) API settings
#[derive(Debug, Deserialize, Clone)]
pub struct Rancher {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    pub pipeline_stack_id: String,
    pub serving_stack_id: String,
    /// Skip TLS certificate verification (self-signed rancher installs)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Rancher 2.x API settings
#[derive(Debug, Deserialize, Clone)]
pub struct Rancher2 {
    pub url: String,
    pub access_key: String,
    pub secret_key: String,
    pub pipeline_project_id: String,
    pub pipeline_namespace_id: String,
    pub serving_project_id: String,
    pub serving_namespace_id: String,
    /// Skip TLS certificate verification (self-signed rancher installs)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Direct Kubernetes API settings
#[derive(Debug, Deserialize, Clone)]
pub struct Kubernetes {
    pub kubeconfig_path: Option<String>,
    pub pipeline_namespace: String,
    pub serving_namespace: String,
}

impl Settings {
    /// Creates a new `Settings` instance
    ///
    /// # Arguments
    ///
    /// * `file` - An optional path to a configuration file
    pub fn new(file: Option<String>) -> Result<Self, ConfigError> {
        let mut s = Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

        if let Some(path) = file {
            s = s.add_source(File::with_name(path.as_str()));
        }

        s = s.add_source(
            Environment::with_prefix("CLEANUP")
                .separator("__")
                .try_parsing(true),
        );

        s.build()?.try_deserialize()
    }
}
