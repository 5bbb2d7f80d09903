//! Pipeline Repository
//!
//! Postgres-backed pipeline store. The definition is kept as a JSONB
//! document; the fields the store itself reasons about (revision, running
//! state) live in columns and take precedence over the document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use weir_core::domain::pipeline::Pipeline;

use super::{PipelineStore, Result, StoreError};

#[derive(Debug, Clone)]
pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn save(&self, mut pipeline: Pipeline) -> Result<Pipeline> {
        let document = serde_json::to_value(&pipeline)?;

        let revision: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO pipelines (
                id, name, created_by_user, running, started_at, revision, document, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, 1, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                created_by_user = EXCLUDED.created_by_user,
                running = EXCLUDED.running,
                started_at = EXCLUDED.started_at,
                revision = pipelines.revision + 1,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            RETURNING revision
            "#,
        )
        .bind(pipeline.id)
        .bind(&pipeline.name)
        .bind(&pipeline.created_by_user)
        .bind(pipeline.running)
        .bind(pipeline.started_at)
        .bind(document)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        pipeline.revision = revision;
        tracing::info!("Pipeline saved: {} ({})", pipeline.name, pipeline.id);

        Ok(pipeline)
    }

    async fn get(&self, id: Uuid) -> Result<Pipeline> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, running, started_at, revision, document
            FROM pipelines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))?;

        row.into_pipeline()
    }

    async fn list(&self) -> Result<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, running, started_at, revision, document
            FROM pipelines
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PipelineRow::into_pipeline).collect()
    }

    async fn update(&self, pipeline: &mut Pipeline) -> Result<()> {
        let expected = pipeline.revision;
        let mut stored = pipeline.clone();
        stored.revision = expected + 1;
        let document = serde_json::to_value(&stored)?;

        let result = sqlx::query(
            r#"
            UPDATE pipelines
            SET name = $1, created_by_user = $2, running = $3, started_at = $4,
                revision = revision + 1, document = $5, updated_at = $6
            WHERE id = $7 AND revision = $8
            "#,
        )
        .bind(&pipeline.name)
        .bind(&pipeline.created_by_user)
        .bind(pipeline.running)
        .bind(pipeline.started_at)
        .bind(document)
        .bind(Utc::now())
        .bind(pipeline.id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM pipelines WHERE id = $1")
                .bind(pipeline.id)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match exists {
                Some(id) => StoreError::Conflict { id, expected },
                None => StoreError::NotFound(pipeline.id),
            });
        }

        pipeline.revision = expected + 1;
        Ok(())
    }

    async fn delete_visualization(&self, pipeline_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM visualizations WHERE pipeline_id = $1")
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!("Visualization deleted for pipeline {}", pipeline_id);
        }
        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    running: bool,
    started_at: Option<DateTime<Utc>>,
    revision: i64,
    document: serde_json::Value,
}

impl PipelineRow {
    fn into_pipeline(self) -> Result<Pipeline> {
        let mut pipeline: Pipeline = serde_json::from_value(self.document)?;
        pipeline.id = self.id;
        pipeline.running = self.running;
        pipeline.started_at = self.started_at;
        pipeline.revision = self.revision;
        Ok(pipeline)
    }
}
