/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! InfluxDB 1.x client over the `/query` HTTP endpoint.

use super::{error_body, MeasurementStore};
use crate::error::{CleanupError, Result};
use async_trait::async_trait;
use cleanup_utils::config::Influx;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatementResult {
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Series {
    values: Vec<Vec<serde_json::Value>>,
}

pub struct InfluxClient {
    client: Client,
    config: Influx,
}

impl InfluxClient {
    pub fn new(config: Influx) -> Self {
        Self {
            client: Client::new(),
            config: Influx {
                url: config.url.trim_end_matches('/').to_string(),
                ..config
            },
        }
    }

    async fn query(&self, method: Method, database: &str, statement: &str) -> Result<QueryResponse> {
        let response = self
            .client
            .request(method, format!("{}/query", self.config.url))
            .query(&[
                ("db", database),
                ("q", statement),
                ("u", self.config.user.as_str()),
                ("p", self.config.password.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: QueryResponse = response.json().await?;
                if let Some(error) = body
                    .error
                    .clone()
                    .or_else(|| body.results.iter().find_map(|r| r.error.clone()))
                {
                    return Err(CleanupError::Upstream(format!("influx: {}", error)));
                }
                Ok(body)
            }
            status => Err(CleanupError::from_status(
                "influx",
                status,
                &error_body(response).await,
            )),
        }
    }
}

/// Quotes an identifier for InfluxQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl MeasurementStore for InfluxClient {
    async fn get_measurements(&self, database: &str) -> Result<Vec<String>> {
        let response = self
            .query(Method::GET, database, "SHOW MEASUREMENTS")
            .await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|result| result.series.into_iter().next())
            .map(|series| {
                series
                    .values
                    .into_iter()
                    .filter_map(|row| row.into_iter().next())
                    .filter_map(|value| value.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn drop_measurement(&self, database: &str, measurement: &str) -> Result<()> {
        let statement = format!("DROP MEASUREMENT {}", quote_identifier(measurement));
        self.query(Method::POST, database, &statement).await?;
        Ok(())
    }
}
