//! Health Check API Handler

use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub running_pipelines: usize,
}

/// GET /health
/// Liveness plus the number of pipelines this orchestrator has deployed
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        running_pipelines: state.executor.running_pipelines().len(),
    })
}
