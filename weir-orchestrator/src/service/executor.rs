//! Pipeline Executor
//!
//! Start, stop and element migration of whole pipelines. Every operation
//! holds the registry lock of its pipeline for its full duration and returns
//! one aggregate status listing every remote call it made.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use weir_core::domain::element::{InvocableElement, NamedEntity};
use weir_core::domain::pipeline::Pipeline;
use weir_core::domain::status::{
    OperationWarning, PipelineOperationStatus, PipelineStatusMessage, PipelineStatusMessageType,
};
use weir_core::dto::pipeline::{ExecutionOptions, RunningGraphSummary};

use crate::graph::{GraphError, build_graph, find_matching, predecessors_of};
use crate::relay::{RelayPlanner, annotate_output_relays, purge_output_relays};
use crate::repository::PipelineStore;
use crate::service::migration::{MigrationPlan, MigrationTarget};
use crate::service::registry::{RunningGraph, RunningGraphRegistry};
use crate::service::saga::SagaOutcome;
use crate::service::secrets::{CredentialService, SecretResolution, decrypt_element, decrypt_secrets};
use crate::service::status::{MonitoringRegistry, StatusSink};
use crate::submitter::{DeploymentBatch, GraphSubmitter, PipelineScope};

/// Reasons an operation is refused before any remote call is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("pipeline {0} is not running")]
    NotRunning(Uuid),

    #[error("pipeline {0} is already running")]
    AlreadyRunning(Uuid),

    #[error("element {dom_id} not found in pipeline {pipeline_id}")]
    ElementNotFound { pipeline_id: Uuid, dom_id: String },

    #[error("pipeline {0} contains a cycle")]
    CyclicGraph(Uuid),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Collaborators of the executor, injected once at startup
pub struct PipelineExecutor {
    submitter: Arc<dyn GraphSubmitter>,
    registry: Arc<RunningGraphRegistry>,
    credentials: Arc<dyn CredentialService>,
    store: Arc<dyn PipelineStore>,
    status: Arc<dyn StatusSink>,
    monitoring: Arc<MonitoringRegistry>,
}

impl PipelineExecutor {
    pub fn new(
        submitter: Arc<dyn GraphSubmitter>,
        registry: Arc<RunningGraphRegistry>,
        credentials: Arc<dyn CredentialService>,
        store: Arc<dyn PipelineStore>,
        status: Arc<dyn StatusSink>,
        monitoring: Arc<MonitoringRegistry>,
    ) -> Self {
        Self {
            submitter,
            registry,
            credentials,
            store,
            status,
            monitoring,
        }
    }

    /// Summary of what is deployed for a pipeline, if it runs
    pub fn running_graph(&self, pipeline_id: Uuid) -> Option<RunningGraphSummary> {
        self.registry.get(pipeline_id).map(|graph| graph.summary(pipeline_id))
    }

    /// Ids of every pipeline with a recorded running graph
    pub fn running_pipelines(&self) -> Vec<Uuid> {
        self.registry.pipelines()
    }

    pub fn is_monitored(&self, pipeline_id: Uuid) -> bool {
        self.monitoring.is_observed(pipeline_id)
    }

    // =============================================================================
    // Start
    // =============================================================================

    /// Deploy every processor, sink and dataset of a pipeline
    ///
    /// When some deployments fail, the ones that succeeded are detached again
    /// and nothing is recorded.
    pub async fn start(&self, pipeline: &Pipeline, options: ExecutionOptions) -> Result<PipelineOperationStatus> {
        let _guard = self.registry.lock(pipeline.id).await;
        if self.registry.contains(pipeline.id) {
            return Err(ExecutorError::AlreadyRunning(pipeline.id));
        }

        let scope = PipelineScope::new(pipeline.id, &pipeline.name);
        let mut deployed = pipeline.clone();
        annotate_output_relays(&mut deployed);

        let elements = deployable_elements(&deployed);
        let datasets = deployed.scoped_datasets();
        let (decrypted, resolutions) =
            decrypt_secrets(&elements, &pipeline.created_by_user, self.credentials.as_ref()).await;
        let relays = RelayPlanner::for_pipeline(&deployed).plan(&decrypted, &deployed.streams);

        info!(
            "Starting pipeline {} ({}): {} elements, {} datasets, {} relays",
            pipeline.name,
            pipeline.id,
            decrypted.len(),
            datasets.len(),
            relays.len()
        );

        let batch = DeploymentBatch::new(decrypted, datasets.clone(), relays);
        let mut status = scope.status();
        status.absorb(self.submitter.invoke_graphs(&scope, &batch).await);
        add_secret_warnings(&mut status, &resolutions);

        if !status.success {
            let started = batch.retain_succeeded(&status);
            warn!(
                "Pipeline {} failed to start ({} failed), detaching {} started entities",
                pipeline.id,
                status.failed_count(),
                started.len()
            );
            if !started.is_empty() {
                status.absorb(self.submitter.detach_graphs(&scope, &started).await);
            }
            return Ok(status);
        }

        self.registry.put(
            pipeline.id,
            RunningGraph::new(elements, datasets, deployed.streams.clone()),
        );
        self.status.publish(PipelineStatusMessage::now(
            pipeline.id,
            PipelineStatusMessageType::PipelineStarted,
        ));
        if options.monitor {
            self.monitoring.add_observer(pipeline.id);
        }
        if options.store_status {
            let mut stored = pipeline.clone();
            stored.running = true;
            stored.started_at = Some(Utc::now());
            self.persist(&mut stored, &mut status).await;
        }

        info!("Pipeline {} started", pipeline.id);
        Ok(status)
    }

    // =============================================================================
    // Stop
    // =============================================================================

    /// Detach everything recorded for a pipeline
    ///
    /// The recorded deployment is used, not the definition, which may have
    /// been edited while the pipeline ran. A failed stop keeps the record so
    /// it can be retried.
    pub async fn stop(&self, pipeline: &Pipeline, options: ExecutionOptions) -> Result<PipelineOperationStatus> {
        let _guard = self.registry.lock(pipeline.id).await;
        let running = self
            .registry
            .get(pipeline.id)
            .ok_or(ExecutorError::NotRunning(pipeline.id))?;

        let scope = PipelineScope::new(pipeline.id, &pipeline.name);
        let relays = RelayPlanner::for_pipeline(pipeline).plan(&running.elements, &running.streams);
        let batch = DeploymentBatch::new(running.elements, running.datasets, relays);

        info!(
            "Stopping pipeline {} ({}): {} entities",
            pipeline.name,
            pipeline.id,
            batch.len()
        );

        let mut status = scope.status();
        status.absorb(self.submitter.detach_graphs(&scope, &batch).await);

        if !status.success {
            warn!(
                "Pipeline {} failed to stop ({} failed), keeping its running graph",
                pipeline.id,
                status.failed_count()
            );
            return Ok(status);
        }

        if options.visualize {
            if let Err(err) = self.store.delete_visualization(pipeline.id).await {
                warn!("Could not delete visualization of {}: {}", pipeline.id, err);
                status.add_warning(OperationWarning::PersistenceFailed {
                    message: err.to_string(),
                });
            }
        }
        if options.store_status {
            let mut stored = pipeline.clone();
            stored.running = false;
            self.persist(&mut stored, &mut status).await;
        }
        self.status.publish(PipelineStatusMessage::now(
            pipeline.id,
            PipelineStatusMessageType::PipelineStopped,
        ));
        if options.monitor {
            self.monitoring.remove_observer(pipeline.id);
        }
        self.registry.remove(pipeline.id);

        info!("Pipeline {} stopped", pipeline.id);
        Ok(status)
    }

    // =============================================================================
    // Migration
    // =============================================================================

    /// Replace the running element `origin_dom_id` with `target_dom_id` of
    /// the edited pipeline
    ///
    /// # Arguments
    /// * `pipeline` - Edited definition containing the replacement
    /// * `current` - Stored definition; the running graph itself is read
    ///   from the registry, `current` only supplies the pipeline identity and
    ///   a fallback for the origin
    /// * `migration` - Replacement and origin DOM ids
    ///
    /// # Returns
    /// The status of every step, including rollback calls. On success the
    /// running graph is replaced by the elements of `pipeline`.
    pub async fn migrate(
        &self,
        pipeline: &Pipeline,
        current: &Pipeline,
        migration: &MigrationTarget,
    ) -> Result<PipelineOperationStatus> {
        let _guard = self.registry.lock(pipeline.id).await;
        let running = self
            .registry
            .get(pipeline.id)
            .ok_or(ExecutorError::NotRunning(pipeline.id))?;

        let mut new_pipeline = pipeline.clone();
        purge_output_relays(&mut new_pipeline);
        annotate_output_relays(&mut new_pipeline);
        let new_graph = build_graph(&new_pipeline);

        // The stored definition may already hold the edit, so the old data
        // path comes from what was recorded as deployed.
        let mut current_pipeline = running.to_pipeline(current);
        annotate_output_relays(&mut current_pipeline);
        let current_graph = build_graph(&current_pipeline);

        if new_graph.is_cyclic() || current_graph.is_cyclic() {
            return Err(ExecutorError::CyclicGraph(pipeline.id));
        }

        let target = new_pipeline
            .find_invocable(&migration.target_dom_id)
            .ok_or_else(|| ExecutorError::ElementNotFound {
                pipeline_id: pipeline.id,
                dom_id: migration.target_dom_id.clone(),
            })?;
        let origin = running
            .find_element(&migration.origin_dom_id)
            .or_else(|| current.find_invocable(&migration.origin_dom_id))
            .ok_or_else(|| ExecutorError::ElementNotFound {
                pipeline_id: pipeline.id,
                dom_id: migration.origin_dom_id.clone(),
            })?;

        let scope = PipelineScope::new(pipeline.id, &pipeline.name);
        let mut status = scope.status();

        let predecessors = predecessors_of(&new_graph, &target.dom_id)
            .map_err(|err| graph_error(pipeline.id, err))?;

        // Relays into the origin are looked up through the counterparts of
        // the new predecessors and through the origin's own predecessors.
        let mut current_predecessors: Vec<&NamedEntity> = Vec::new();
        for predecessor in &predecessors {
            match find_matching(predecessor, &current_graph) {
                Some(matched) => push_unique(&mut current_predecessors, matched),
                None => {
                    warn!(
                        "Predecessor {} of {} has no counterpart in the running graph",
                        predecessor.dom_id(),
                        target.dom_id
                    );
                    status.add_warning(OperationWarning::UnmatchedPredecessor {
                        dom_id: predecessor.dom_id().to_string(),
                    });
                }
            }
        }
        if current_graph.contains(&origin.dom_id) {
            let origin_predecessors = predecessors_of(&current_graph, &origin.dom_id)
                .map_err(|err| graph_error(pipeline.id, err))?;
            for predecessor in origin_predecessors {
                push_unique(&mut current_predecessors, predecessor);
            }
        }

        let old_relays = RelayPlanner::for_pipeline(&current_pipeline).find_relays(&current_predecessors, origin);
        let new_relays = RelayPlanner::for_pipeline(&new_pipeline).find_relays(&predecessors, target);

        let mut deployable_target = target.clone();
        deployable_target.stream_requirements.clear();
        let (deployable_target, resolutions) =
            decrypt_element(&deployable_target, &pipeline.created_by_user, self.credentials.as_ref()).await;
        add_secret_warnings(&mut status, &resolutions);

        info!(
            "Migrating {} to {} in pipeline {} ({} old relays, {} new relays)",
            origin.dom_id,
            target.dom_id,
            pipeline.id,
            old_relays.len(),
            new_relays.len()
        );

        let plan = MigrationPlan {
            scope,
            target: deployable_target,
            origin: origin.clone(),
            old_relays,
            new_relays,
        };
        let outcome = plan.into_saga(self.submitter.clone()).run(&mut status).await;

        match outcome {
            SagaOutcome::Completed => {
                self.registry.put(
                    pipeline.id,
                    RunningGraph::new(
                        deployable_elements(&new_pipeline),
                        new_pipeline.scoped_datasets(),
                        new_pipeline.streams.clone(),
                    ),
                );
                self.status.publish(PipelineStatusMessage::now(
                    pipeline.id,
                    PipelineStatusMessageType::ElementMigrated,
                ));
                info!("Migrated {} to {} in pipeline {}", origin.dom_id, target.dom_id, pipeline.id);
            }
            SagaOutcome::RolledBack {
                failed_step,
                compensated,
            } => {
                warn!(
                    "Migration in pipeline {} failed at '{}', rolled back {:?}",
                    pipeline.id, failed_step, compensated
                );
            }
        }

        status.refresh_success();
        Ok(status)
    }

    /// Write the pipeline back; a failure is reported as a warning
    async fn persist(&self, pipeline: &mut Pipeline, status: &mut PipelineOperationStatus) {
        if let Err(err) = self.store.update(pipeline).await {
            warn!("Could not persist state of pipeline {}: {}", pipeline.id, err);
            status.add_warning(OperationWarning::PersistenceFailed {
                message: err.to_string(),
            });
        }
    }
}

/// Processors and sinks as deployed: design-time requirements stripped
fn deployable_elements(pipeline: &Pipeline) -> Vec<InvocableElement> {
    pipeline
        .invocables()
        .cloned()
        .map(|mut element| {
            element.stream_requirements.clear();
            element
        })
        .collect()
}

fn add_secret_warnings(status: &mut PipelineOperationStatus, resolutions: &[SecretResolution]) {
    for warning in resolutions.iter().filter_map(SecretResolution::warning) {
        status.add_warning(warning);
    }
}

fn push_unique<'g>(entities: &mut Vec<&'g NamedEntity>, entity: &'g NamedEntity) {
    if !entities.iter().any(|known| known.dom_id() == entity.dom_id()) {
        entities.push(entity);
    }
}

fn graph_error(pipeline_id: Uuid, err: GraphError) -> ExecutorError {
    match err {
        GraphError::Cyclic => ExecutorError::CyclicGraph(pipeline_id),
        GraphError::UnknownElement(dom_id) => ExecutorError::ElementNotFound { pipeline_id, dom_id },
    }
}
