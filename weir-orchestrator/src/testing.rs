//! Fixtures and scripted fakes shared by unit tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use weir_core::domain::element::{
    DataStream, DeploymentTarget, ElementKind, EventGrounding, InvocableElement, StreamInput,
    StreamKind, TransportKind,
};
use weir_core::domain::relay::RelayContainer;
use weir_core::domain::status::{PipelineElementStatus, PipelineOperationStatus};

use crate::service::secrets::{CredentialService, SecurityError};
use crate::submitter::{DeploymentBatch, GraphSubmitter, PipelineScope};

pub fn target(node_id: &str) -> DeploymentTarget {
    DeploymentTarget::new(node_id, format!("{}.local", node_id), 7077)
}

/// Grounding of the broker local to `node_id`
pub fn grounding(node_id: &str, topic: &str) -> EventGrounding {
    EventGrounding::new(TransportKind::Kafka, format!("broker.{}", node_id), 9092, topic)
}

pub fn stream(dom_id: &str, node_id: &str) -> DataStream {
    DataStream {
        dom_id: dom_id.to_string(),
        element_id: format!("{}-instance", dom_id),
        name: dom_id.to_string(),
        kind: StreamKind::Stream,
        grounding: grounding(node_id, &format!("topic.{}", dom_id)),
        deployment_target: target(node_id),
        corresponding_pipeline: None,
    }
}

pub fn dataset(dom_id: &str, node_id: &str) -> DataStream {
    DataStream {
        kind: StreamKind::Set,
        ..stream(dom_id, node_id)
    }
}

fn invocable(dom_id: &str, node_id: &str, connected_to: &[&str], kind: ElementKind) -> InvocableElement {
    // inputs read the producer's topic on the consumer's broker
    let input_streams = connected_to
        .iter()
        .map(|producer| StreamInput {
            grounding: grounding(node_id, &format!("topic.{}", producer)),
        })
        .collect();
    let output_stream = match kind {
        ElementKind::Processor => Some(DataStream {
            dom_id: format!("{}-out", dom_id),
            element_id: format!("{}-out", dom_id),
            name: format!("{} output", dom_id),
            kind: StreamKind::Stream,
            grounding: grounding(node_id, &format!("topic.{}", dom_id)),
            deployment_target: target(node_id),
            corresponding_pipeline: None,
        }),
        ElementKind::Sink => None,
    };

    InvocableElement {
        dom_id: dom_id.to_string(),
        element_id: format!("{}-instance", dom_id),
        name: dom_id.to_string(),
        kind,
        input_streams,
        connected_to: connected_to.iter().map(|s| s.to_string()).collect(),
        stream_requirements: vec!["requirement".to_string()],
        deployment_target: target(node_id),
        static_properties: vec![],
        output_stream,
        output_stream_relays: vec![],
    }
}

pub fn processor(dom_id: &str, node_id: &str, connected_to: &[&str]) -> InvocableElement {
    invocable(dom_id, node_id, connected_to, ElementKind::Processor)
}

pub fn sink(dom_id: &str, node_id: &str, connected_to: &[&str]) -> InvocableElement {
    invocable(dom_id, node_id, connected_to, ElementKind::Sink)
}

// =============================================================================
// Scripted submitter
// =============================================================================

/// One call observed by [`ScriptedSubmitter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    InvokeGraphs(Vec<String>),
    DetachGraphs(Vec<String>),
    InvokeRelays(Vec<String>),
    DetachRelays(Vec<String>),
}

/// Submitter that records every call and fails the ids it was told to fail
///
/// Element ids are matched for elements and datasets, `status_id()` for relays.
#[derive(Default)]
pub struct ScriptedSubmitter {
    calls: Mutex<Vec<Call>>,
    fail_invoke: Mutex<HashSet<String>>,
    fail_detach: Mutex<HashSet<String>>,
}

impl ScriptedSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_invoke(&self, id: impl Into<String>) {
        self.fail_invoke.lock().unwrap().insert(id.into());
    }

    pub fn fail_detach(&self, id: impl Into<String>) {
        self.fail_detach.lock().unwrap().insert(id.into());
    }

    pub fn heal(&self) {
        self.fail_invoke.lock().unwrap().clear();
        self.fail_detach.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn answer(
        &self,
        scope: &PipelineScope,
        ids: Vec<(String, String)>,
        failing: &Mutex<HashSet<String>>,
        verb: &str,
    ) -> PipelineOperationStatus {
        let failing = failing.lock().unwrap();
        let statuses = ids
            .into_iter()
            .map(|(id, name)| {
                if failing.contains(&id) {
                    PipelineElementStatus::failed(id, name, format!("{} refused", verb))
                } else {
                    PipelineElementStatus::succeeded(id, name, verb)
                }
            })
            .collect();
        PipelineOperationStatus::from_elements(scope.pipeline_id, &scope.pipeline_name, statuses)
    }
}

fn batch_ids(batch: &DeploymentBatch) -> Vec<(String, String)> {
    batch
        .elements
        .iter()
        .map(|e| (e.element_id.clone(), e.name.clone()))
        .chain(batch.datasets.iter().map(|d| (d.element_id.clone(), d.name.clone())))
        .chain(batch.relays.iter().map(|r| (r.status_id(), r.name.clone())))
        .collect()
}

fn relay_ids(relays: &[RelayContainer]) -> Vec<(String, String)> {
    relays.iter().map(|r| (r.status_id(), r.name.clone())).collect()
}

fn only_ids(ids: &[(String, String)]) -> Vec<String> {
    ids.iter().map(|(id, _)| id.clone()).collect()
}

#[async_trait]
impl GraphSubmitter for ScriptedSubmitter {
    async fn invoke_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus {
        let ids = batch_ids(batch);
        self.calls.lock().unwrap().push(Call::InvokeGraphs(only_ids(&ids)));
        self.answer(scope, ids, &self.fail_invoke, "invoked")
    }

    async fn detach_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus {
        let ids = batch_ids(batch);
        self.calls.lock().unwrap().push(Call::DetachGraphs(only_ids(&ids)));
        self.answer(scope, ids, &self.fail_detach, "detached")
    }

    async fn invoke_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus {
        let ids = relay_ids(relays);
        self.calls.lock().unwrap().push(Call::InvokeRelays(only_ids(&ids)));
        self.answer(scope, ids, &self.fail_invoke, "invoked")
    }

    async fn detach_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus {
        let ids = relay_ids(relays);
        self.calls.lock().unwrap().push(Call::DetachRelays(only_ids(&ids)));
        self.answer(scope, ids, &self.fail_detach, "detached")
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Credential service that "decrypts" by stripping an `enc:` prefix
pub struct PrefixCredentials;

#[async_trait]
impl CredentialService for PrefixCredentials {
    async fn decrypt(&self, _owner: &str, ciphertext: &str) -> Result<String, SecurityError> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| SecurityError::Rejected(format!("not a ciphertext: {}", ciphertext)))
    }
}
