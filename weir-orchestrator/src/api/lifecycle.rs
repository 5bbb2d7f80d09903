//! Lifecycle API Handlers
//!
//! Start, stop and migration of stored pipelines, plus runtime inspection.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;
use weir_core::domain::status::{OperationWarning, PipelineOperationStatus, PipelineStatusMessage};
use weir_core::dto::pipeline::{ExecutionOptions, MigrateElement, RunningGraphSummary};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::MigrationTarget;

/// POST /api/pipeline/{id}/start
/// Deploy a stored pipeline
pub async fn start_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(options): Query<ExecutionOptions>,
) -> ApiResult<Json<PipelineOperationStatus>> {
    tracing::info!("Starting pipeline: {}", id);

    let pipeline = state.store.get(id).await?;
    let status = state.executor.start(&pipeline, options).await?;

    Ok(Json(status))
}

/// POST /api/pipeline/{id}/stop
/// Detach everything deployed for a pipeline
pub async fn stop_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(options): Query<ExecutionOptions>,
) -> ApiResult<Json<PipelineOperationStatus>> {
    tracing::info!("Stopping pipeline: {}", id);

    let pipeline = state.store.get(id).await?;
    let status = state.executor.stop(&pipeline, options).await?;

    Ok(Json(status))
}

/// POST /api/pipeline/{id}/migrate
/// Replace one running element with an element of the edited pipeline
///
/// On success the edited definition becomes the stored one, still running.
pub async fn migrate_element(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MigrateElement>,
) -> ApiResult<Json<PipelineOperationStatus>> {
    if req.pipeline.id != id {
        return Err(ApiError::BadRequest(format!(
            "Pipeline id {} does not match path id {}",
            req.pipeline.id, id
        )));
    }
    tracing::info!(
        "Migrating element {} to {} in pipeline {}",
        req.origin_dom_id,
        req.target_dom_id,
        id
    );

    let current = state.store.get(id).await?;
    let migration = MigrationTarget {
        target_dom_id: req.target_dom_id,
        origin_dom_id: req.origin_dom_id,
    };
    let mut status = state.executor.migrate(&req.pipeline, &current, &migration).await?;

    if status.success {
        let mut edited = req.pipeline;
        edited.running = true;
        edited.started_at = current.started_at;
        edited.revision = current.revision;
        if let Err(err) = state.store.update(&mut edited).await {
            tracing::warn!("Could not store migrated pipeline {}: {}", id, err);
            status.add_warning(OperationWarning::PersistenceFailed {
                message: err.to_string(),
            });
        }
    }

    Ok(Json(status))
}

/// GET /api/pipeline/{id}/status
/// Lifecycle messages recorded for a pipeline
pub async fn status_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<PipelineStatusMessage>>> {
    Ok(Json(state.status.history(id)))
}

/// GET /api/pipeline/{id}/running
/// What is currently deployed for a pipeline
pub async fn running_graph(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RunningGraphSummary>> {
    state
        .executor
        .running_graph(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline {} is not running", id)))
}
