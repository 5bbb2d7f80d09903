//! Pipeline graph entities
//!
//! Streams, processors and sinks, plus the groundings and deployment targets
//! that tie them to execution nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::relay::StreamRelay;

/// The execution node that hosts an element or relay
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub node_id: String,
    pub hostname: String,
    pub port: u16,
}

impl DeploymentTarget {
    pub fn new(node_id: impl Into<String>, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            hostname: hostname.into(),
            port,
        }
    }

    /// Base URL of the node API (e.g., "http://edge-01:7077")
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }

    /// Two targets denote the same node iff their node ids match
    pub fn same_node(&self, other: &DeploymentTarget) -> bool {
        self.node_id == other.node_id
    }
}

/// Messaging protocol carrying a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Kafka,
    Mqtt,
    Jms,
}

/// Broker coordinates and topic of a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportProtocol {
    pub kind: TransportKind,
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
}

/// Transport description of a stream (where its events can be consumed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGrounding {
    pub protocol: TransportProtocol,
}

impl EventGrounding {
    pub fn new(kind: TransportKind, broker_host: impl Into<String>, broker_port: u16, topic: impl Into<String>) -> Self {
        Self {
            protocol: TransportProtocol {
                kind,
                broker_host: broker_host.into(),
                broker_port,
                topic: topic.into(),
            },
        }
    }

    pub fn topic(&self) -> &str {
        &self.protocol.topic
    }
}

/// Whether a stream is a live stream or a dataset with materialized state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Stream,
    Set,
}

/// A data stream or dataset (graph root)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStream {
    /// Stable graph identifier, unique within one pipeline graph
    pub dom_id: String,
    pub element_id: String,
    pub name: String,
    pub kind: StreamKind,
    pub grounding: EventGrounding,
    pub deployment_target: DeploymentTarget,
    /// Owning pipeline, set on the copies deployed for a pipeline
    #[serde(default)]
    pub corresponding_pipeline: Option<Uuid>,
}

impl DataStream {
    pub fn is_dataset(&self) -> bool {
        self.kind == StreamKind::Set
    }

    /// Copy of this dataset scoped to the given pipeline
    pub fn scoped_to(&self, pipeline_id: Uuid) -> Self {
        let mut copy = self.clone();
        copy.corresponding_pipeline = Some(pipeline_id);
        copy
    }
}

/// Kind of a deployable element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Processor,
    Sink,
}

/// One input of an invocable element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInput {
    /// Grounding this input consumes from
    pub grounding: EventGrounding,
}

/// Secret marker of a static property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretState {
    pub encrypted: bool,
}

/// A configuration value of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticProperty {
    pub internal_name: String,
    pub value: String,
    #[serde(default)]
    pub secret: Option<SecretState>,
}

impl StaticProperty {
    pub fn plain(internal_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            value: value.into(),
            secret: None,
        }
    }

    /// A secret property holding ciphertext
    pub fn encrypted(internal_name: impl Into<String>, ciphertext: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            value: ciphertext.into(),
            secret: Some(SecretState { encrypted: true }),
        }
    }

    pub fn is_encrypted_secret(&self) -> bool {
        matches!(self.secret, Some(SecretState { encrypted: true }))
    }
}

/// A processor or sink that can be deployed on, and detached from, a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocableElement {
    pub dom_id: String,
    /// Running instance id used by the node
    pub element_id: String,
    pub name: String,
    pub kind: ElementKind,
    /// Inputs, parallel to `connected_to`
    pub input_streams: Vec<StreamInput>,
    /// `connected_to[i]` is the DOM id of the producer bound to input `i`
    pub connected_to: Vec<String>,
    /// Design-time stream requirements; cleared on deployed copies
    #[serde(default)]
    pub stream_requirements: Vec<String>,
    pub deployment_target: DeploymentTarget,
    #[serde(default)]
    pub static_properties: Vec<StaticProperty>,
    /// Output of a processor; sinks have none
    #[serde(default)]
    pub output_stream: Option<DataStream>,
    #[serde(default)]
    pub output_stream_relays: Vec<StreamRelay>,
}

impl InvocableElement {
    /// Position of `producer_dom_id` in `connected_to`
    pub fn input_index(&self, producer_dom_id: &str) -> Option<usize> {
        self.connected_to.iter().position(|dom| dom == producer_dom_id)
    }

    /// Grounding expected at the input bound to `producer_dom_id`
    pub fn input_grounding_for(&self, producer_dom_id: &str) -> Option<&EventGrounding> {
        self.input_index(producer_dom_id)
            .and_then(|index| self.input_streams.get(index))
            .map(|input| &input.grounding)
    }

    /// Topics this element consumes
    pub fn input_topics(&self) -> impl Iterator<Item = &str> {
        self.input_streams.iter().map(|input| input.grounding.topic())
    }
}

/// Any node of a pipeline graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NamedEntity {
    Stream(DataStream),
    Invocable(InvocableElement),
}

impl NamedEntity {
    pub fn dom_id(&self) -> &str {
        match self {
            NamedEntity::Stream(stream) => &stream.dom_id,
            NamedEntity::Invocable(element) => &element.dom_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NamedEntity::Stream(stream) => &stream.name,
            NamedEntity::Invocable(element) => &element.name,
        }
    }

    pub fn deployment_target(&self) -> &DeploymentTarget {
        match self {
            NamedEntity::Stream(stream) => &stream.deployment_target,
            NamedEntity::Invocable(element) => &element.deployment_target,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, NamedEntity::Stream(_))
    }

    pub fn as_invocable(&self) -> Option<&InvocableElement> {
        match self {
            NamedEntity::Invocable(element) => Some(element),
            NamedEntity::Stream(_) => None,
        }
    }
}
