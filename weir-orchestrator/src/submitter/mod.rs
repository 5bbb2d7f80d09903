//! Graph Submitter
//!
//! The capability the executor uses to deploy and undeploy entities on
//! execution nodes. Every remote call yields one element status; transport
//! failures are reported as failed statuses, never as errors that abort a
//! batch.

mod http;

pub use http::HttpGraphSubmitter;

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;
use weir_core::domain::element::{DataStream, InvocableElement};
use weir_core::domain::relay::RelayContainer;
use weir_core::domain::status::PipelineOperationStatus;

/// Pipeline an operation is performed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineScope {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
}

impl PipelineScope {
    pub fn new(pipeline_id: Uuid, pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_id,
            pipeline_name: pipeline_name.into(),
        }
    }

    /// Empty status for this pipeline
    pub fn status(&self) -> PipelineOperationStatus {
        PipelineOperationStatus::new(self.pipeline_id, &self.pipeline_name)
    }
}

/// Entities deployed or undeployed together
#[derive(Debug, Clone, Default)]
pub struct DeploymentBatch {
    pub elements: Vec<InvocableElement>,
    pub datasets: Vec<DataStream>,
    pub relays: Vec<RelayContainer>,
}

impl DeploymentBatch {
    pub fn new(elements: Vec<InvocableElement>, datasets: Vec<DataStream>, relays: Vec<RelayContainer>) -> Self {
        Self {
            elements,
            datasets,
            relays,
        }
    }

    /// Batch holding only invocable elements
    pub fn elements(elements: Vec<InvocableElement>) -> Self {
        Self {
            elements,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.datasets.is_empty() && self.relays.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len() + self.datasets.len() + self.relays.len()
    }

    /// The part of this batch whose calls succeeded in `status`
    pub fn retain_succeeded(&self, status: &PipelineOperationStatus) -> DeploymentBatch {
        let succeeded: HashSet<&str> = status.succeeded_ids().into_iter().collect();
        DeploymentBatch {
            elements: self
                .elements
                .iter()
                .filter(|e| succeeded.contains(e.element_id.as_str()))
                .cloned()
                .collect(),
            datasets: self
                .datasets
                .iter()
                .filter(|d| succeeded.contains(d.element_id.as_str()))
                .cloned()
                .collect(),
            relays: succeeded_relays(&self.relays, status),
        }
    }
}

/// Relays whose call succeeded in `status`, matched by `status_id()`
pub fn succeeded_relays(relays: &[RelayContainer], status: &PipelineOperationStatus) -> Vec<RelayContainer> {
    let succeeded: HashSet<&str> = status.succeeded_ids().into_iter().collect();
    relays
        .iter()
        .filter(|relay| succeeded.contains(relay.status_id().as_str()))
        .cloned()
        .collect()
}

/// Deploys entities on, and detaches them from, their execution nodes
///
/// Implementations must await every call of a batch before returning; the
/// returned status lists one entry per call. An empty input yields an empty,
/// successful status.
#[async_trait]
pub trait GraphSubmitter: Send + Sync {
    /// Deploy elements and datasets, then relays
    async fn invoke_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus;

    /// Detach relays, then elements and datasets
    ///
    /// Entities that are not running on their node count as detached.
    async fn detach_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus;

    async fn invoke_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus;

    async fn detach_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dataset, grounding, sink, target};
    use weir_core::domain::pipeline::RelayStrategy;
    use weir_core::domain::status::PipelineElementStatus;

    #[test]
    fn test_retain_succeeded_matches_elements_datasets_and_relays() {
        let scope = PipelineScope::new(Uuid::new_v4(), "p");
        let relay_ok = RelayContainer::new(
            scope.pipeline_id,
            RelayStrategy::Buffer,
            "a",
            grounding("n1", "topic.a"),
            target("n1"),
        );
        let relay_failed = RelayContainer::new(
            scope.pipeline_id,
            RelayStrategy::Buffer,
            "b",
            grounding("n1", "topic.b"),
            target("n1"),
        );
        let batch = DeploymentBatch::new(
            vec![sink("k1", "n1", &[]), sink("k2", "n1", &[])],
            vec![dataset("d1", "n1")],
            vec![relay_ok.clone(), relay_failed.clone()],
        );

        let mut status = scope.status();
        status.add_element_status(PipelineElementStatus::succeeded("k1-instance", "k1", "ok"));
        status.add_element_status(PipelineElementStatus::failed("k2-instance", "k2", "refused"));
        status.add_element_status(PipelineElementStatus::succeeded("d1-instance", "d1", "ok"));
        status.add_element_status(PipelineElementStatus::succeeded(relay_ok.status_id(), "a", "ok"));
        status.add_element_status(PipelineElementStatus::failed(relay_failed.status_id(), "b", "x"));

        let started = batch.retain_succeeded(&status);

        assert_eq!(started.elements.len(), 1);
        assert_eq!(started.elements[0].dom_id, "k1");
        assert_eq!(started.datasets.len(), 1);
        assert_eq!(started.relays, vec![relay_ok]);
        assert_eq!(started.len(), 3);
        assert!(!started.is_empty());
    }
}
