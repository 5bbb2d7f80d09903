//! Execution node endpoints
//!
//! Every call targets the node named by the entity's deployment target, so a
//! single client serves all nodes of a pipeline.

use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use weir_core::domain::element::{DataStream, DeploymentTarget, InvocableElement};
use weir_core::domain::relay::RelayContainer;
use weir_core::dto::node::NodeResponse;

use crate::error::Result;
use crate::handle_response;

/// HTTP client for execution node APIs
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
}

impl NodeClient {
    /// Create a node client with a default HTTP client
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a node client with a configured HTTP client (timeouts, TLS, ...)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // =============================================================================
    // Elements
    // =============================================================================

    /// Deploy a processor or sink on its node
    pub async fn invoke_element(&self, element: &InvocableElement) -> Result<NodeResponse> {
        self.post(&element.deployment_target, "elements", element).await
    }

    /// Undeploy a processor or sink from its node
    pub async fn detach_element(&self, element: &InvocableElement) -> Result<NodeResponse> {
        self.post(&element.deployment_target, "elements/detach", element)
            .await
    }

    // =============================================================================
    // Datasets
    // =============================================================================

    /// Start replaying a dataset for its owning pipeline
    pub async fn invoke_dataset(&self, dataset: &DataStream) -> Result<NodeResponse> {
        self.post(&dataset.deployment_target, "datasets", dataset).await
    }

    /// Stop a dataset replay
    pub async fn detach_dataset(&self, dataset: &DataStream) -> Result<NodeResponse> {
        self.post(&dataset.deployment_target, "datasets/detach", dataset)
            .await
    }

    // =============================================================================
    // Relays
    // =============================================================================

    /// Start a stream relay on the producer's node
    pub async fn invoke_relay(&self, relay: &RelayContainer) -> Result<NodeResponse> {
        self.post(&relay.deployment_target, "relays", relay).await
    }

    /// Stop a stream relay
    pub async fn detach_relay(&self, relay: &RelayContainer) -> Result<NodeResponse> {
        self.post(&relay.deployment_target, "relays/detach", relay).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        target: &DeploymentTarget,
        path: &str,
        body: &B,
    ) -> Result<NodeResponse> {
        let url = format!("{}/api/node/{}", target.base_url(), path);
        debug!("POST {} (node {})", url, target.node_id);

        let response = self.client.post(&url).json(body).send().await?;

        handle_response(response).await
    }
}

impl Default for NodeClient {
    fn default() -> Self {
        Self::new()
    }
}
