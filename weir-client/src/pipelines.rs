//! Pipeline-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use crate::handle_response;
use uuid::Uuid;
use weir_core::domain::pipeline::Pipeline;
use weir_core::domain::status::{PipelineOperationStatus, PipelineStatusMessage};
use weir_core::dto::pipeline::{
    ExecutionOptions, MigrateElement, PipelineSummary, RunningGraphSummary,
};

impl OrchestratorClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Create or replace a pipeline definition
    ///
    /// # Returns
    /// The stored pipeline, including its new revision
    ///
    /// # Example
    /// ```no_run
    /// # use weir_client::OrchestratorClient;
    /// # use weir_core::domain::pipeline::Pipeline;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// let pipeline = client.save_pipeline(&Pipeline::new("temperature", "alice")).await?;
    /// println!("revision {}", pipeline.revision);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<Pipeline> {
        let url = format!("{}/api/pipeline", self.base_url);
        let response = self.client.put(&url).json(pipeline).send().await?;

        handle_response(response).await
    }

    /// List all stored pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let url = format!("{}/api/pipeline/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Get a pipeline by ID
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<Pipeline> {
        let url = format!("{}/api/pipeline/{}", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    // =============================================================================
    // Lifecycle
    // =============================================================================

    /// Deploy every element of a stored pipeline
    ///
    /// The returned status carries one entry per attempted element; inspect
    /// `success` before assuming the pipeline runs.
    pub async fn start_pipeline(
        &self,
        pipeline_id: Uuid,
        options: ExecutionOptions,
    ) -> Result<PipelineOperationStatus> {
        let url = format!("{}/api/pipeline/{}/start", self.base_url, pipeline_id);
        let response = self.client.post(&url).query(&options).send().await?;

        handle_response(response).await
    }

    /// Detach every element the orchestrator recorded for a running pipeline
    pub async fn stop_pipeline(
        &self,
        pipeline_id: Uuid,
        options: ExecutionOptions,
    ) -> Result<PipelineOperationStatus> {
        let url = format!("{}/api/pipeline/{}/stop", self.base_url, pipeline_id);
        let response = self.client.post(&url).query(&options).send().await?;

        handle_response(response).await
    }

    /// Replace one running element with an element of an edited pipeline
    pub async fn migrate_element(&self, req: &MigrateElement) -> Result<PipelineOperationStatus> {
        let url = format!("{}/api/pipeline/{}/migrate", self.base_url, req.pipeline.id);
        let response = self.client.post(&url).json(req).send().await?;

        handle_response(response).await
    }

    // =============================================================================
    // Runtime Inspection
    // =============================================================================

    /// Lifecycle messages recorded for a pipeline, oldest first
    pub async fn pipeline_status_history(
        &self,
        pipeline_id: Uuid,
    ) -> Result<Vec<PipelineStatusMessage>> {
        let url = format!("{}/api/pipeline/{}/status", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Elements and datasets currently deployed for a pipeline
    pub async fn running_graph(&self, pipeline_id: Uuid) -> Result<RunningGraphSummary> {
        let url = format!("{}/api/pipeline/{}/running", self.base_url, pipeline_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }
}
