//! Repository Module
//!
//! Durable storage of pipeline definitions.
//! The executor and the API only see the [`PipelineStore`] trait; Postgres
//! backs it in production and an in-memory map in tests and development.

pub mod memory;
pub mod pipeline;

pub use memory::InMemoryPipelineStore;
pub use pipeline::PgPipelineStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use weir_core::domain::pipeline::Pipeline;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pipeline {0} not found")]
    NotFound(Uuid),

    /// The stored revision differs from the one the caller read
    #[error("pipeline {id} was modified concurrently (expected revision {expected})")]
    Conflict { id: Uuid, expected: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid pipeline document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage of pipeline definitions with optimistic concurrency
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Create or replace a pipeline unconditionally
    ///
    /// # Returns
    /// The stored pipeline with its new revision
    async fn save(&self, pipeline: Pipeline) -> Result<Pipeline>;

    async fn get(&self, id: Uuid) -> Result<Pipeline>;

    async fn list(&self) -> Result<Vec<Pipeline>>;

    /// Replace a pipeline if its stored revision equals `pipeline.revision`
    ///
    /// On success `pipeline.revision` is advanced to the stored one.
    async fn update(&self, pipeline: &mut Pipeline) -> Result<()>;

    /// Drop the visualization state kept for a pipeline, if any
    async fn delete_visualization(&self, pipeline_id: Uuid) -> Result<()>;
}
