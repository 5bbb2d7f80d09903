//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline definitions.

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;
use weir_core::domain::pipeline::Pipeline;
use weir_core::dto::pipeline::PipelineSummary;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// PUT /api/pipeline
/// Create or replace a pipeline definition
pub async fn save_pipeline(
    State(state): State<AppState>,
    Json(pipeline): Json<Pipeline>,
) -> ApiResult<Json<Pipeline>> {
    tracing::info!("Saving pipeline: {} ({})", pipeline.name, pipeline.id);

    validate_pipeline(&pipeline)?;
    let saved = state.store.save(pipeline).await?;

    Ok(Json(saved))
}

/// GET /api/pipeline/list
/// List all pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> ApiResult<Json<Vec<PipelineSummary>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = state.store.list().await?;

    Ok(Json(pipelines.iter().map(PipelineSummary::from).collect()))
}

/// GET /api/pipeline/{id}
/// Get pipeline by ID
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = state.store.get(id).await?;

    Ok(Json(pipeline))
}

// =============================================================================
// Validation
// =============================================================================

fn validate_pipeline(pipeline: &Pipeline) -> ApiResult<()> {
    if pipeline.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if pipeline.name.len() > 255 {
        return Err(ApiError::BadRequest(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    if pipeline.created_by_user.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Pipeline owner cannot be empty".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    let dom_ids = pipeline
        .streams
        .iter()
        .map(|s| s.dom_id.as_str())
        .chain(pipeline.invocables().map(|e| e.dom_id.as_str()));
    for dom_id in dom_ids {
        if !seen.insert(dom_id) {
            return Err(ApiError::BadRequest(format!("Duplicate DOM id: {}", dom_id)));
        }
    }

    for element in pipeline.invocables() {
        if element.connected_to.len() != element.input_streams.len() {
            return Err(ApiError::BadRequest(format!(
                "Element {} has {} connections for {} inputs",
                element.dom_id,
                element.connected_to.len(),
                element.input_streams.len()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sink, stream};

    #[test]
    fn test_validate_empty_name() {
        let pipeline = Pipeline::new("  ", "alice");
        assert!(matches!(validate_pipeline(&pipeline), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_validate_duplicate_dom_id() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("a", "n1"));
        pipeline.sinks.push(sink("a", "n1", &["a"]));
        assert!(matches!(validate_pipeline(&pipeline), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_validate_connections_match_inputs() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.sinks.push(sink("k1", "n1", &["s1"]));
        assert!(validate_pipeline(&pipeline).is_ok());

        pipeline.sinks[0].connected_to.push("s2".to_string());
        assert!(matches!(validate_pipeline(&pipeline), Err(ApiError::BadRequest(_))));
    }
}
