/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::api;
use crate::clients::{
    self, InfluxClient, KeycloakClient, PipelineRegistryClient, ServingRegistryClient,
};
use crate::drivers;
use crate::reconcile::{CleanupOptions, CleanupService, Collaborators};
use cleanup_utils::config::Settings;
use cleanup_utils::logging::prelude::*;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Builds the cleanup service from configuration and logs the service
/// account in. The returned keycloak client ends that session on shutdown.
pub async fn build_service(
    config: &Settings,
    shutdown: CancellationToken,
) -> Result<(CleanupService, Arc<KeycloakClient>), Box<dyn std::error::Error>> {
    info!("Connecting collaborators");
    let keycloak = Arc::new(KeycloakClient::new(config.keycloak.clone()));
    keycloak.login().await?;

    let collaborators = Collaborators {
        driver: drivers::build_driver(config).await?,
        pipelines: Arc::new(PipelineRegistryClient::new(
            &config.pipeline.registry_url,
            &config.pipeline.engine_url,
        )),
        servings: Arc::new(ServingRegistryClient::new(&config.serving.registry_url)),
        identity: keycloak.clone(),
        topics: clients::build_topic_admin(&config.kafka)?,
        measurements: Arc::new(InfluxClient::new(config.influx.clone())),
    };

    let service = CleanupService::new(
        collaborators,
        CleanupOptions::from_settings(config),
        shutdown,
    );
    Ok((service, keycloak))
}

async fn logout(keycloak: &KeycloakClient) {
    if let Err(e) = keycloak.logout().await {
        warn!("Keycloak logout failed: {}", e);
    }
}

/// Function to start the cleanup API server
///
/// Builds the service, configures the API routes and serves until ctrl+c or
/// SIGTERM.
/// Shutdown cancels the root token, which stops a running kafka bulk delete.
pub async fn serve(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting analytics cleanup service");
    let shutdown = CancellationToken::new();
    let (service, keycloak) = build_service(config, shutdown.clone()).await?;

    info!("Configuring API routes");
    let app = api::configure_api_routes(config).with_state(service);

    let addr = format!("0.0.0.0:{}", config.server.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Analytics cleanup service is now running");
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_on_shutdown(shutdown_requested(), shutdown))
        .await?;

    logout(&keycloak).await;
    info!("Analytics cleanup service stopped");
    Ok(())
}

/// Resolves on ctrl+c or SIGTERM. The SIGTERM handler is installed before the
/// returned future is first polled.
fn shutdown_requested() -> impl Future<Output = ()> {
    let terminate = terminate_signal();
    async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("Received ctrl+c"),
            _ = terminate => info!("Received SIGTERM"),
        }
    }
}

#[cfg(unix)]
fn terminate_signal() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => Box::pin(async move {
            sigterm.recv().await;
        }),
        Err(e) => {
            error!("Failed to listen for SIGTERM: {}", e);
            Box::pin(std::future::pending())
        }
    }
}

#[cfg(not(unix))]
fn terminate_signal() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(std::future::pending())
}

async fn cancel_on_shutdown(signal: impl Future<Output = ()>, token: CancellationToken) {
    signal.await;
    info!("Shutdown requested");
    token.cancel();
}

/// Runs a single cleanup pass and returns.
pub async fn run_once(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running a single cleanup pass");
    let (service, keycloak) = build_service(config, CancellationToken::new()).await?;
    let result = service
        .start_cleanup_service(config.recreate_pipelines, config.recreate_servings)
        .await;
    logout(&keycloak).await;
    result?;
    info!("Cleanup pass finished");
    Ok(())
}
