//! Stream relay types
//!
//! A relay is a forwarding hop inserted when a producer and its consumer run
//! on different nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::element::{DeploymentTarget, EventGrounding};
use crate::domain::pipeline::RelayStrategy;

/// One forwarding destination of a relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRelay {
    /// Grounding the consumer expects
    pub grounding: EventGrounding,
}

/// A relay hosted on the producer's node, forwarding one input grounding to
/// one or more consumer groundings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayContainer {
    /// Always the owning pipeline id
    pub running_instance_id: Uuid,
    pub strategy: RelayStrategy,
    pub name: String,
    pub input_grounding: EventGrounding,
    pub deployment_target: DeploymentTarget,
    pub output_relays: Vec<StreamRelay>,
}

impl RelayContainer {
    pub fn new(
        pipeline_id: Uuid,
        strategy: RelayStrategy,
        producer_name: &str,
        input_grounding: EventGrounding,
        deployment_target: DeploymentTarget,
    ) -> Self {
        Self {
            running_instance_id: pipeline_id,
            strategy,
            name: format!("{} (Stream Relay)", producer_name),
            input_grounding,
            deployment_target,
            output_relays: Vec::new(),
        }
    }

    /// Identifier of this relay within an operation status
    pub fn status_id(&self) -> String {
        format!("{}/{}", self.running_instance_id, self.input_grounding.topic())
    }

    /// Add a forwarding destination; duplicates are ignored
    pub fn add_output(&mut self, grounding: EventGrounding) {
        if !self.output_relays.iter().any(|relay| relay.grounding == grounding) {
            self.output_relays.push(StreamRelay { grounding });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::element::TransportKind;

    #[test]
    fn test_relay_outputs_are_merged() {
        let pipeline_id = Uuid::new_v4();
        let mut relay = RelayContainer::new(
            pipeline_id,
            RelayStrategy::Buffer,
            "Temperature",
            EventGrounding::new(TransportKind::Kafka, "edge", 9092, "temp"),
            DeploymentTarget::new("n1", "edge-01", 7077),
        );
        let out = EventGrounding::new(TransportKind::Kafka, "cloud", 9092, "temp");
        relay.add_output(out.clone());
        relay.add_output(out);
        relay.add_output(EventGrounding::new(TransportKind::Mqtt, "cloud", 1883, "temp"));

        assert_eq!(relay.name, "Temperature (Stream Relay)");
        assert_eq!(relay.output_relays.len(), 2);
        assert_eq!(relay.status_id(), format!("{}/temp", pipeline_id));
    }
}
