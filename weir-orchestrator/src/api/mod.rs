//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod lifecycle;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::repository::PipelineStore;
use crate::service::{PipelineExecutor, StatusSink};

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<PipelineExecutor>,
    pub store: Arc<dyn PipelineStore>,
    pub status: Arc<dyn StatusSink>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline definitions
        .route("/api/pipeline", put(pipeline::save_pipeline))
        .route("/api/pipeline/list", get(pipeline::list_pipelines))
        .route("/api/pipeline/{id}", get(pipeline::get_pipeline))
        // Lifecycle
        .route("/api/pipeline/{id}/start", post(lifecycle::start_pipeline))
        .route("/api/pipeline/{id}/stop", post(lifecycle::stop_pipeline))
        .route("/api/pipeline/{id}/migrate", post(lifecycle::migrate_element))
        // Runtime inspection
        .route("/api/pipeline/{id}/status", get(lifecycle::status_history))
        .route("/api/pipeline/{id}/running", get(lifecycle::running_graph))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
