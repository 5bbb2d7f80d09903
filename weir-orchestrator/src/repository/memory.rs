//! In-memory pipeline store, used when no database is configured

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;
use weir_core::domain::pipeline::Pipeline;

use super::{PipelineStore, Result, StoreError};

#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    pipelines: RwLock<HashMap<Uuid, Pipeline>>,
    visualizations: RwLock<HashSet<Uuid>>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_visualization(&self, pipeline_id: Uuid) {
        self.visualizations.write().await.insert(pipeline_id);
    }

    pub async fn has_visualization(&self, pipeline_id: Uuid) -> bool {
        self.visualizations.read().await.contains(&pipeline_id)
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn save(&self, mut pipeline: Pipeline) -> Result<Pipeline> {
        let mut pipelines = self.pipelines.write().await;
        pipeline.revision = pipelines.get(&pipeline.id).map_or(1, |stored| stored.revision + 1);
        pipelines.insert(pipeline.id, pipeline.clone());

        tracing::info!("Pipeline saved: {} ({})", pipeline.name, pipeline.id);
        Ok(pipeline)
    }

    async fn get(&self, id: Uuid) -> Result<Pipeline> {
        self.pipelines
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<Pipeline>> {
        let mut pipelines: Vec<Pipeline> = self.pipelines.read().await.values().cloned().collect();
        pipelines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pipelines)
    }

    async fn update(&self, pipeline: &mut Pipeline) -> Result<()> {
        let mut pipelines = self.pipelines.write().await;
        let stored = pipelines
            .get(&pipeline.id)
            .ok_or(StoreError::NotFound(pipeline.id))?;

        if stored.revision != pipeline.revision {
            return Err(StoreError::Conflict {
                id: pipeline.id,
                expected: pipeline.revision,
            });
        }

        pipeline.revision += 1;
        pipelines.insert(pipeline.id, pipeline.clone());
        Ok(())
    }

    async fn delete_visualization(&self, pipeline_id: Uuid) -> Result<()> {
        self.visualizations.write().await.remove(&pipeline_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_assigns_revisions() {
        let store = InMemoryPipelineStore::new();
        let pipeline = Pipeline::new("p", "alice");

        let saved = store.save(pipeline.clone()).await.unwrap();
        assert_eq!(saved.revision, 1);

        let saved = store.save(pipeline).await.unwrap();
        assert_eq!(saved.revision, 2);
        assert_eq!(store.get(saved.id).await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_update_with_stale_revision_conflicts() {
        let store = InMemoryPipelineStore::new();
        let mut first = store.save(Pipeline::new("p", "alice")).await.unwrap();
        let mut second = first.clone();

        first.running = true;
        store.update(&mut first).await.unwrap();
        assert_eq!(first.revision, 2);

        second.name = "renamed".to_string();
        let err = store.update(&mut second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, .. }));
        assert!(store.get(first.id).await.unwrap().running);
    }

    #[tokio::test]
    async fn test_update_unknown_pipeline() {
        let store = InMemoryPipelineStore::new();
        let mut pipeline = Pipeline::new("p", "alice");

        let err = store.update(&mut pipeline).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_visualization_is_deleted() {
        let store = InMemoryPipelineStore::new();
        let id = Uuid::new_v4();
        store.save_visualization(id).await;
        assert!(store.has_visualization(id).await);

        store.delete_visualization(id).await.unwrap();
        assert!(!store.has_visualization(id).await);
    }
}
