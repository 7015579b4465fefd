/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cleanup Service
//!
//! Orphan detection, deletion and recreation across every collaborator.
//!
//! Detection is always recomputed from live data; nothing is cached between
//! calls. Bulk deletes of pipelines, workloads, services and serving
//! instances run synchronously and stop at the first failing item, returning
//! the error. Bulk deletion of kafka topics runs as a background task whose
//! progress is kept in a [`DeleteStatus`] guarded by a mutex; at most one
//! such task runs at a time and it can be stopped through its cancellation
//! token, or by cancelling the service's root token at shutdown.

use crate::clients::{
    ClusterDriver, IdentityProvider, MeasurementStore, PipelineRegistry, ServingRegistry,
    TopicAdmin,
};
use crate::error::{CleanupError, Result};
use crate::metrics;
use crate::reconcile::matching::{
    is_internal_analytics_topic, measurement_in_servings, pipe_in_workloads, pipeline_exists,
    serving_in_workloads, service_in_workloads, workload_in_pipes, workload_in_servings,
};
use cleanup_models::models::{
    Collection, DeleteStatus, InfluxMeasurement, KubeService, Pipeline, ServingInstance, Workload,
};
use cleanup_utils::config::Settings;
use cleanup_utils::logging::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PIPELINE: &str = "pipeline";
const ANALYTICS_WORKLOAD: &str = "analytics_workload";
const KUBE_SERVICE: &str = "kube_service";
const KAFKA_TOPIC: &str = "kafka_topic";
const SERVING: &str = "serving";
const SERVING_WORKLOAD: &str = "serving_workload";
const INFLUX_MEASUREMENT: &str = "influx_measurement";

/// Error entry recorded when a kafka bulk delete is stopped.
pub const ABORTED: &str = "aborted";

/// The collaborators the service reconciles between.
#[derive(Clone)]
pub struct Collaborators {
    pub driver: Arc<dyn ClusterDriver>,
    pub pipelines: Arc<dyn PipelineRegistry>,
    pub servings: Arc<dyn ServingRegistry>,
    pub identity: Arc<dyn IdentityProvider>,
    pub topics: Arc<dyn TopicAdmin>,
    pub measurements: Arc<dyn MeasurementStore>,
}

/// Timing knobs of the long running deletes.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Pause between two topic deletions of a bulk delete.
    pub kafka_delete_interval: Duration,
    /// Drop attempts before a measurement that keeps reappearing is an error.
    pub max_drop_attempts: u32,
    pub drop_retry_interval: Duration,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            kafka_delete_interval: Duration::from_millis(1000),
            max_drop_attempts: 10,
            drop_retry_interval: Duration::from_millis(1000),
        }
    }
}

impl CleanupOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            kafka_delete_interval: Duration::from_millis(settings.cleanup.kafka_delete_interval_ms),
            max_drop_attempts: settings.influx.max_drop_attempts.max(1),
            drop_retry_interval: Duration::from_millis(settings.influx.drop_retry_interval_ms),
        }
    }
}

/// Bookkeeping of the kafka bulk delete. `cancel` is set exactly while a
/// task owns the run.
#[derive(Default)]
struct KafkaDeleteState {
    status: DeleteStatus,
    cancel: Option<CancellationToken>,
}

impl KafkaDeleteState {
    fn finish(&mut self) {
        self.status.running = false;
        self.cancel = None;
        metrics::KAFKA_DELETE_RUNNING.set(0);
    }
}

fn lock(state: &Mutex<KafkaDeleteState>) -> MutexGuard<'_, KafkaDeleteState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap to clone; clones share the kafka delete state.
#[derive(Clone)]
pub struct CleanupService {
    collaborators: Collaborators,
    options: CleanupOptions,
    shutdown: CancellationToken,
    kafka_delete: Arc<Mutex<KafkaDeleteState>>,
}

impl CleanupService {
    pub fn new(
        collaborators: Collaborators,
        options: CleanupOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            collaborators,
            options,
            shutdown,
            kafka_delete: Arc::new(Mutex::new(KafkaDeleteState::default())),
        }
    }

    /// Root token; cancelling it stops a running kafka bulk delete.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.collaborators.identity
    }

    /// Pipelines of the user that have no workload. Pipelines with a locally
    /// deployed operator never get a cluster workload and are skipped.
    pub async fn get_orphaned_pipeline_services(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Pipeline>> {
        let pipes = self
            .collaborators
            .pipelines
            .get_pipelines(user_id, token)
            .await?;
        let workloads = self
            .collaborators
            .driver
            .get_workloads(Collection::Pipeline)
            .await?;

        Ok(pipes
            .into_iter()
            .filter(|pipe| !pipe.has_local_operator() && !pipe_in_workloads(pipe, &workloads))
            .collect())
    }

    pub async fn delete_orphaned_pipeline_service(&self, id: &str, token: &str) -> Result<()> {
        match self.collaborators.pipelines.delete_pipeline(id, token).await {
            Ok(()) => {
                info!("Deleted orphaned pipeline {}", id);
                metrics::record_deleted(PIPELINE);
                Ok(())
            }
            Err(e) => {
                metrics::record_failure(PIPELINE);
                Err(e)
            }
        }
    }

    /// Deletes every orphaned pipeline of the user with the caller's token and
    /// returns the deleted ones.
    pub async fn delete_orphaned_pipeline_services(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Pipeline>> {
        let orphans = self.get_orphaned_pipeline_services(user_id, token).await?;
        for pipe in &orphans {
            self.delete_orphaned_pipeline_service(&pipe.id, token).await?;
        }
        Ok(orphans)
    }

    pub async fn get_orphaned_analytics_workloads(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Workload>> {
        let pipes = self
            .collaborators
            .pipelines
            .get_pipelines(user_id, token)
            .await?;
        let workloads = self
            .collaborators
            .driver
            .get_workloads(Collection::Pipeline)
            .await?;

        Ok(workloads
            .into_iter()
            .filter(|workload| !workload_in_pipes(workload, &pipes))
            .collect())
    }

    pub async fn delete_orphaned_analytics_workload(&self, name: &str) -> Result<()> {
        self.delete_workload(name, Collection::Pipeline, ANALYTICS_WORKLOAD)
            .await
    }

    pub async fn delete_orphaned_analytics_workloads(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Workload>> {
        let orphans = self.get_orphaned_analytics_workloads(user_id, token).await?;
        for workload in &orphans {
            self.delete_orphaned_analytics_workload(&workload.name)
                .await?;
        }
        Ok(orphans)
    }

    async fn delete_workload(
        &self,
        name: &str,
        collection: Collection,
        category: &str,
    ) -> Result<()> {
        match self
            .collaborators
            .driver
            .delete_workload(name, collection)
            .await
        {
            Ok(()) => {
                info!("Deleted orphaned {} workload {}", collection, name);
                metrics::record_deleted(category);
                Ok(())
            }
            Err(e) => {
                metrics::record_failure(category);
                Err(e)
            }
        }
    }

    /// Services of the collection whose first target workload is gone.
    pub async fn get_orphaned_kube_services(
        &self,
        collection: Collection,
    ) -> Result<Vec<KubeService>> {
        let services = self.collaborators.driver.get_services(collection).await?;
        let workloads = self.collaborators.driver.get_workloads(collection).await?;

        Ok(services
            .into_iter()
            .filter(|service| !service_in_workloads(service, &workloads))
            .collect())
    }

    pub async fn delete_orphaned_kube_service(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<()> {
        match self
            .collaborators
            .driver
            .delete_service(id, collection)
            .await
        {
            Ok(()) => {
                info!("Deleted orphaned {} kube service {}", collection, id);
                metrics::record_deleted(KUBE_SERVICE);
                Ok(())
            }
            Err(e) => {
                metrics::record_failure(KUBE_SERVICE);
                Err(e)
            }
        }
    }

    pub async fn delete_orphaned_kube_services(
        &self,
        collection: Collection,
    ) -> Result<Vec<KubeService>> {
        let orphans = self.get_orphaned_kube_services(collection).await?;
        for service in &orphans {
            self.delete_orphaned_kube_service(collection, &service.id)
                .await?;
        }
        Ok(orphans)
    }

    /// Internal repartition/changelog topics whose pipeline has no running
    /// workload.
    pub async fn get_orphaned_kafka_topics(&self) -> Result<Vec<String>> {
        let topics = self.collaborators.topics.get_topics().await?;
        let envs = self
            .collaborators
            .driver
            .get_workload_envs(Collection::Pipeline)
            .await?;

        Ok(topics
            .into_iter()
            .filter(|topic| is_internal_analytics_topic(topic) && !pipeline_exists(topic, &envs))
            .collect())
    }

    pub async fn delete_orphaned_kafka_topic(&self, name: &str) -> Result<()> {
        delete_topic(self.collaborators.topics.as_ref(), name).await
    }

    /// Starts the background deletion of every orphaned topic and returns the
    /// initial status.
    ///
    /// Fails with `Conflict` while a previous run is still active; the status
    /// of that run is left untouched. The run counts as active from the moment
    /// it is reserved, so while the orphans are listed the status reports
    /// `running` and a stop ends the run before its first deletion. A failed
    /// listing restores the previous status.
    pub async fn delete_orphaned_kafka_topics(&self) -> Result<DeleteStatus> {
        let (cancel, previous) = {
            let mut state = lock(&self.kafka_delete);
            if state.cancel.is_some() {
                return Err(CleanupError::Conflict(
                    "delete task already running".to_string(),
                ));
            }
            let cancel = self.shutdown.child_token();
            state.cancel = Some(cancel.clone());
            let previous = std::mem::replace(
                &mut state.status,
                DeleteStatus {
                    running: true,
                    ..DeleteStatus::default()
                },
            );
            (cancel, previous)
        };

        let orphans = match self.get_orphaned_kafka_topics().await {
            Ok(orphans) => orphans,
            Err(e) => {
                let mut state = lock(&self.kafka_delete);
                state.status = previous;
                state.cancel = None;
                return Err(e);
            }
        };

        let status = {
            let mut state = lock(&self.kafka_delete);
            state.status = DeleteStatus::started(orphans.len());
            if cancel.is_cancelled() {
                warn!("Kafka topic deletion stopped before the first topic");
                state.status.errors.push(ABORTED.to_string());
                state.finish();
                return Ok(state.status.clone());
            }
            state.status.clone()
        };
        metrics::KAFKA_DELETE_RUNNING.set(1);
        metrics::KAFKA_DELETE_REMAINING.set(orphans.len() as i64);
        info!("Starting deletion of {} orphaned kafka topics", orphans.len());

        tokio::spawn(run_kafka_delete(
            self.collaborators.topics.clone(),
            self.kafka_delete.clone(),
            orphans,
            cancel,
            self.options.kafka_delete_interval,
        ));

        Ok(status)
    }

    pub fn get_delete_orphaned_kafka_topics_status(&self) -> DeleteStatus {
        lock(&self.kafka_delete).status.clone()
    }

    /// Requests a stop of the running bulk delete. The task records
    /// `aborted` before its next topic.
    pub fn stop_delete_orphaned_kafka_topics(&self) -> Result<()> {
        let state = lock(&self.kafka_delete);
        match &state.cancel {
            Some(cancel) => {
                info!("Stopping kafka topic deletion");
                cancel.cancel();
                Ok(())
            }
            None => Err(CleanupError::Conflict(
                "kafka topic delete not running".to_string(),
            )),
        }
    }

    pub async fn get_orphaned_serving_services(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<ServingInstance>> {
        let servings = self
            .collaborators
            .servings
            .get_serving_services(user_id, token)
            .await?;
        let workloads = self
            .collaborators
            .driver
            .get_workloads(Collection::Serving)
            .await?;

        Ok(servings
            .into_iter()
            .filter(|serving| !serving_in_workloads(serving, &workloads))
            .collect())
    }

    pub async fn delete_orphaned_serving_service(
        &self,
        id: &str,
        user_id: &str,
        token: &str,
    ) -> Result<()> {
        match self
            .collaborators
            .servings
            .delete_serving_service(id, user_id, token)
            .await
        {
            Ok(()) => {
                info!("Deleted orphaned serving instance {}", id);
                metrics::record_deleted(SERVING);
                Ok(())
            }
            Err(e) => {
                metrics::record_failure(SERVING);
                Err(e)
            }
        }
    }

    pub async fn delete_orphaned_serving_services(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<ServingInstance>> {
        let orphans = self.get_orphaned_serving_services(user_id, token).await?;
        for serving in &orphans {
            self.delete_orphaned_serving_service(&serving.id, user_id, token)
                .await?;
        }
        Ok(orphans)
    }

    pub async fn get_orphaned_serving_workloads(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Workload>> {
        let servings = self
            .collaborators
            .servings
            .get_serving_services(user_id, token)
            .await?;
        let workloads = self
            .collaborators
            .driver
            .get_workloads(Collection::Serving)
            .await?;

        Ok(workloads
            .into_iter()
            .filter(|workload| !workload_in_servings(workload, &servings))
            .collect())
    }

    pub async fn delete_orphaned_serving_workload(&self, name: &str) -> Result<()> {
        self.delete_workload(name, Collection::Serving, SERVING_WORKLOAD)
            .await
    }

    pub async fn delete_orphaned_serving_workloads(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<Workload>> {
        let orphans = self.get_orphaned_serving_workloads(user_id, token).await?;
        for workload in &orphans {
            self.delete_orphaned_serving_workload(&workload.name).await?;
        }
        Ok(orphans)
    }

    /// Measurements of the serving databases that no serving instance writes.
    pub async fn get_orphaned_influx_measurements(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Vec<InfluxMeasurement>> {
        let servings = self
            .collaborators
            .servings
            .get_serving_services(user_id, token)
            .await?;

        let mut databases: Vec<&str> = Vec::new();
        for serving in &servings {
            if !serving.database.is_empty() && !databases.contains(&serving.database.as_str()) {
                databases.push(&serving.database);
            }
        }

        let mut orphans = Vec::new();
        for database in databases {
            let measurements = self
                .collaborators
                .measurements
                .get_measurements(database)
                .await?;
            orphans.extend(
                measurements
                    .into_iter()
                    .filter(|measurement| !measurement_in_servings(measurement, &servings))
                    .map(|measurement| InfluxMeasurement {
                        id: measurement,
                        database_id: database.to_string(),
                    }),
            );
        }
        Ok(orphans)
    }

    /// Drops a measurement until it no longer shows up.
    ///
    /// Writers still feeding the measurement recreate it right after a drop,
    /// so the drop is repeated up to `max_drop_attempts` times.
    pub async fn force_delete_measurement(&self, database: &str, measurement: &str) -> Result<()> {
        let store = &self.collaborators.measurements;
        for attempt in 1..=self.options.max_drop_attempts {
            let dropped = async {
                store.drop_measurement(database, measurement).await?;
                store.get_measurements(database).await
            }
            .await;

            let remaining = match dropped {
                Ok(remaining) => remaining,
                Err(e) => {
                    metrics::record_failure(INFLUX_MEASUREMENT);
                    return Err(e);
                }
            };
            if !remaining.iter().any(|m| m == measurement) {
                info!("Dropped influx measurement {}.{}", database, measurement);
                metrics::record_deleted(INFLUX_MEASUREMENT);
                return Ok(());
            }

            debug!(
                "Measurement {}.{} still present after attempt {}",
                database, measurement, attempt
            );
            tokio::time::sleep(self.options.drop_retry_interval).await;
        }

        metrics::record_failure(INFLUX_MEASUREMENT);
        Err(CleanupError::Upstream(format!(
            "measurement {}.{} still present after {} drop attempts",
            database, measurement, self.options.max_drop_attempts
        )))
    }

    /// Resubmits every pipeline without a workload on behalf of its owner.
    ///
    /// Failing to obtain an owner's token aborts the pass; a failed
    /// submission is logged and the pass continues. Returns how many
    /// pipelines were resubmitted.
    pub async fn recreate_pipelines(
        &self,
        pipes: &[Pipeline],
        workloads: &[Workload],
    ) -> Result<usize> {
        let mut recreated = 0;
        for pipe in pipes.iter().filter(|pipe| !pipe_in_workloads(pipe, workloads)) {
            info!(
                "Pipeline {} ({}) of user {} has no workload, recreating",
                pipe.id, pipe.name, pipe.user_id
            );
            let request = pipe.to_request();
            let token = self
                .collaborators
                .identity
                .get_impersonate_token(&pipe.user_id)
                .await?;

            match self
                .collaborators
                .pipelines
                .create_pipeline(&request, &pipe.user_id, &token)
                .await
            {
                Ok(()) => recreated += 1,
                Err(e) => error!("Failed to recreate pipeline {}: {}", pipe.id, e),
            }
        }
        Ok(recreated)
    }

    /// Recreates the transfer workload of every serving instance without one.
    /// Failures are logged and skipped.
    pub async fn recreate_serving_instances(
        &self,
        servings: &[ServingInstance],
        workloads: &[Workload],
    ) -> usize {
        let mut recreated = 0;
        for serving in servings
            .iter()
            .filter(|serving| !serving_in_workloads(serving, workloads))
        {
            info!("Serving instance {} has no workload, recreating", serving.id);
            match self
                .collaborators
                .driver
                .create_serving_instance(serving, &serving.data_fields(), &serving.tag_fields())
                .await
            {
                Ok(id) => {
                    debug!("Serving instance {} recreated as {}", serving.id, id);
                    recreated += 1;
                }
                Err(e) => error!("Failed to recreate serving instance {}: {}", serving.id, e),
            }
        }
        recreated
    }

    /// One cleanup pass as the service account: recreates missing pipelines
    /// and, when asked, missing serving transfer workloads.
    pub async fn start_cleanup_service(
        &self,
        recreate_pipes: bool,
        recreate_servings: bool,
    ) -> Result<()> {
        if !recreate_pipes && !recreate_servings {
            info!("Nothing to recreate");
            return Ok(());
        }

        let user = self.collaborators.identity.get_user_info().await?;
        let token = self.collaborators.identity.get_access_token().await;

        if recreate_pipes {
            let pipes = self
                .collaborators
                .pipelines
                .get_pipelines(&user.sub, &token)
                .await?;
            let workloads = self.workloads_or_empty(Collection::Pipeline).await;
            let recreated = self.recreate_pipelines(&pipes, &workloads).await?;
            info!("Recreated {} of {} pipelines", recreated, pipes.len());
        }

        if recreate_servings {
            let servings = self
                .collaborators
                .servings
                .get_serving_services(&user.sub, &token)
                .await?;
            let workloads = self.workloads_or_empty(Collection::Serving).await;
            let recreated = self.recreate_serving_instances(&servings, &workloads).await;
            info!("Recreated {} of {} serving instances", recreated, servings.len());
        }
        Ok(())
    }

    async fn workloads_or_empty(&self, collection: Collection) -> Vec<Workload> {
        self.collaborators
            .driver
            .get_workloads(collection)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not list {} workloads, assuming none: {}", collection, e);
                Vec::new()
            })
    }
}

/// Deletes one topic. A topic that is already gone counts as deleted.
async fn delete_topic(topics: &dyn TopicAdmin, name: &str) -> Result<()> {
    match topics.delete_topic(name).await {
        Ok(()) => {
            info!("Deleted orphaned kafka topic {}", name);
            metrics::record_deleted(KAFKA_TOPIC);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            warn!("Kafka topic {} already gone", name);
            Ok(())
        }
        Err(e) => {
            metrics::record_failure(KAFKA_TOPIC);
            Err(e)
        }
    }
}

async fn run_kafka_delete(
    topics: Arc<dyn TopicAdmin>,
    state: Arc<Mutex<KafkaDeleteState>>,
    orphans: Vec<String>,
    cancel: CancellationToken,
    interval: Duration,
) {
    let total = orphans.len();
    for (index, topic) in orphans.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("Kafka topic deletion aborted with {} topics left", total - index);
            let mut state = lock(&state);
            state.status.errors.push(ABORTED.to_string());
            state.finish();
            return;
        }

        let failure = delete_topic(topics.as_ref(), topic).await.err();
        if let Some(e) = &failure {
            error!("Failed to delete kafka topic {}: {}", topic, e);
        }

        let remaining = total - (index + 1);
        {
            let mut state = lock(&state);
            state.status.remaining = remaining;
            if let Some(e) = failure {
                state.status.errors.push(format!("{}: {}", topic, e));
            }
        }
        metrics::KAFKA_DELETE_REMAINING.set(remaining as i64);

        if remaining > 0 {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    info!("Finished deleting {} orphaned kafka topics", total);
    lock(&state).finish();
}
