//! Relay planning
//!
//! A relay is needed wherever a producer and the consumer bound to it run on
//! different nodes. Stream producers get an explicit [`RelayContainer`]; the
//! cross-node outputs of processors are recorded on the processor itself as
//! output stream relays and deployed together with it.

use uuid::Uuid;
use weir_core::domain::element::{DataStream, EventGrounding, InvocableElement, NamedEntity};
use weir_core::domain::pipeline::{Pipeline, RelayStrategy};
use weir_core::domain::relay::{RelayContainer, StreamRelay};

use crate::graph::build_graph;

/// Plans relay containers for one pipeline
#[derive(Debug, Clone, Copy)]
pub struct RelayPlanner {
    pipeline_id: Uuid,
    strategy: RelayStrategy,
}

impl RelayPlanner {
    pub fn new(pipeline_id: Uuid, strategy: RelayStrategy) -> Self {
        Self {
            pipeline_id,
            strategy,
        }
    }

    pub fn for_pipeline(pipeline: &Pipeline) -> Self {
        Self::new(pipeline.id, pipeline.relay_strategy)
    }

    /// Relays needed to feed `candidates` from `streams`
    ///
    /// One container per producing stream, listing every consumer grounding it
    /// must forward to. Streams come out in declaration order.
    pub fn plan(&self, candidates: &[InvocableElement], streams: &[DataStream]) -> Vec<RelayContainer> {
        let mut containers = RelayContainers::default();

        for stream in streams {
            for candidate in candidates {
                if let Some(expected) = self.stream_output(stream, candidate) {
                    containers
                        .entry(&stream.dom_id, || self.container_for_stream(stream))
                        .add_output(expected.clone());
                }
            }
        }

        containers.into_vec()
    }

    /// Relays that carry `predecessors` into `target`
    ///
    /// Used by migration for both the relays feeding the origin and the
    /// relays feeding the replacement. Stream predecessors are resolved
    /// through the consumer's `connected_to` index, processor predecessors
    /// through the output stream relays recorded on them.
    pub fn find_relays(&self, predecessors: &[&NamedEntity], target: &InvocableElement) -> Vec<RelayContainer> {
        let mut containers = RelayContainers::default();

        for predecessor in predecessors {
            match predecessor {
                NamedEntity::Stream(stream) => {
                    if let Some(expected) = self.stream_output(stream, target) {
                        containers
                            .entry(&stream.dom_id, || self.container_for_stream(stream))
                            .add_output(expected.clone());
                    }
                }
                NamedEntity::Invocable(producer) => {
                    let Some(output) = &producer.output_stream else {
                        continue;
                    };
                    if producer.deployment_target.same_node(&target.deployment_target) {
                        continue;
                    }
                    let Some(expected) = target.input_grounding_for(&producer.dom_id) else {
                        continue;
                    };
                    let recorded: Vec<&StreamRelay> = producer
                        .output_stream_relays
                        .iter()
                        .filter(|relay| &relay.grounding == expected)
                        .collect();
                    if recorded.is_empty() {
                        tracing::debug!(
                            "No output relay of {} feeds {}, skipping",
                            producer.dom_id,
                            target.dom_id
                        );
                        continue;
                    }
                    let container = containers.entry(&producer.dom_id, || {
                        RelayContainer::new(
                            self.pipeline_id,
                            self.strategy,
                            &producer.name,
                            output.grounding.clone(),
                            producer.deployment_target.clone(),
                        )
                    });
                    for relay in recorded {
                        container.add_output(relay.grounding.clone());
                    }
                }
            }
        }

        containers.into_vec()
    }

    /// Grounding `consumer` expects from `stream`, if the pair needs a relay
    fn stream_output<'c>(&self, stream: &DataStream, consumer: &'c InvocableElement) -> Option<&'c EventGrounding> {
        if stream.deployment_target.same_node(&consumer.deployment_target) {
            return None;
        }
        consumer.input_grounding_for(&stream.dom_id)
    }

    fn container_for_stream(&self, stream: &DataStream) -> RelayContainer {
        RelayContainer::new(
            self.pipeline_id,
            self.strategy,
            &stream.name,
            stream.grounding.clone(),
            stream.deployment_target.clone(),
        )
    }
}

/// Containers keyed by producer DOM id, in first-seen order
#[derive(Default)]
struct RelayContainers {
    entries: Vec<(String, RelayContainer)>,
}

impl RelayContainers {
    fn entry(&mut self, producer: &str, create: impl FnOnce() -> RelayContainer) -> &mut RelayContainer {
        let index = match self.entries.iter().position(|(key, _)| key == producer) {
            Some(index) => index,
            None => {
                self.entries.push((producer.to_string(), create()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    fn into_vec(self) -> Vec<RelayContainer> {
        self.entries.into_iter().map(|(_, container)| container).collect()
    }
}

/// Relays needed to deploy `candidates` as part of `pipeline`
pub fn plan_relays(candidates: &[InvocableElement], pipeline: &Pipeline) -> Vec<RelayContainer> {
    RelayPlanner::for_pipeline(pipeline).plan(candidates, &pipeline.streams)
}

/// Drop every output stream relay recorded on the pipeline's processors
pub fn purge_output_relays(pipeline: &mut Pipeline) {
    for processor in &mut pipeline.processors {
        processor.output_stream_relays.clear();
    }
}

/// Record on each processor one output relay per successor hosted on another node
///
/// The relay carries the grounding the successor expects at the input bound
/// to the processor. Previously recorded relays are replaced.
pub fn annotate_output_relays(pipeline: &mut Pipeline) {
    let graph = build_graph(pipeline);

    for processor in &mut pipeline.processors {
        let mut relays: Vec<StreamRelay> = Vec::new();
        for successor in graph.outgoing(&processor.dom_id) {
            let Some(consumer) = successor.as_invocable() else {
                continue;
            };
            if consumer.deployment_target.same_node(&processor.deployment_target) {
                continue;
            }
            if let Some(expected) = consumer.input_grounding_for(&processor.dom_id) {
                let relay = StreamRelay {
                    grounding: expected.clone(),
                };
                if !relays.contains(&relay) {
                    relays.push(relay);
                }
            }
        }
        processor.output_stream_relays = relays;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{grounding, processor, sink, stream};

    #[test]
    fn test_same_node_pipeline_needs_no_relays() {
        let mut pipeline = Pipeline::new("local", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.streams.push(stream("s2", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1", "s2"]));
        pipeline.sinks.push(sink("k1", "n1", &["p1", "s2"]));

        let candidates: Vec<_> = pipeline.invocables().cloned().collect();
        assert!(plan_relays(&candidates, &pipeline).is_empty());
    }

    #[test]
    fn test_cross_node_edge_yields_one_relay_at_connection_index() {
        let mut pipeline = Pipeline::new("edge-to-cloud", "alice");
        pipeline.streams.push(stream("s0", "n2"));
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.sinks.push(sink("k1", "n2", &["s0", "s1"]));

        let candidates: Vec<_> = pipeline.invocables().cloned().collect();
        let relays = plan_relays(&candidates, &pipeline);

        assert_eq!(relays.len(), 1);
        let relay = &relays[0];
        assert_eq!(relay.running_instance_id, pipeline.id);
        assert_eq!(relay.input_grounding, pipeline.streams[1].grounding);
        assert_eq!(relay.deployment_target.node_id, "n1");
        assert_eq!(relay.name, "s1 (Stream Relay)");
        // the sink binds s1 at input 1
        assert_eq!(relay.output_relays.len(), 1);
        assert_eq!(
            relay.output_relays[0].grounding,
            pipeline.sinks[0].input_streams[1].grounding
        );
    }

    #[test]
    fn test_consumers_of_one_stream_share_a_container() {
        let mut pipeline = Pipeline::new("fan-out", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n2", &["s1"]));
        pipeline.sinks.push(sink("k1", "n3", &["s1"]));
        pipeline.sinks.push(sink("k2", "n3", &["s1"]));

        let candidates: Vec<_> = pipeline.invocables().cloned().collect();
        let relays = plan_relays(&candidates, &pipeline);

        assert_eq!(relays.len(), 1);
        // k1 and k2 expect the same grounding on n3
        assert_eq!(relays[0].output_relays.len(), 2);
        assert_eq!(relays[0].output_relays[0].grounding, grounding("n2", "topic.s1"));
        assert_eq!(relays[0].output_relays[1].grounding, grounding("n3", "topic.s1"));
    }

    #[test]
    fn test_unconnected_stream_is_not_relayed() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.streams.push(stream("s2", "n1"));
        pipeline.sinks.push(sink("k1", "n2", &["s1"]));

        let candidates: Vec<_> = pipeline.invocables().cloned().collect();
        let relays = plan_relays(&candidates, &pipeline);

        assert_eq!(relays.len(), 1);
        assert_eq!(relays[0].input_grounding.topic(), "topic.s1");
    }

    #[test]
    fn test_annotate_output_relays_marks_cross_node_successors() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1"]));
        pipeline.sinks.push(sink("local", "n1", &["p1"]));
        pipeline.sinks.push(sink("remote", "n2", &["p1"]));
        pipeline.processors[0].output_stream_relays.push(StreamRelay {
            grounding: grounding("stale", "topic.stale"),
        });

        annotate_output_relays(&mut pipeline);

        let relays = &pipeline.processors[0].output_stream_relays;
        assert_eq!(relays.len(), 1);
        assert_eq!(relays[0].grounding, grounding("n2", "topic.p1"));

        purge_output_relays(&mut pipeline);
        assert!(pipeline.processors[0].output_stream_relays.is_empty());
    }

    #[test]
    fn test_find_relays_covers_stream_and_processor_predecessors() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1"]));
        pipeline.sinks.push(sink("k1", "n2", &["s1", "p1"]));
        annotate_output_relays(&mut pipeline);

        let graph = build_graph(&pipeline);
        let s1 = graph.entity("s1").unwrap();
        let p1 = graph.entity("p1").unwrap();
        let target = pipeline.sinks[0].clone();

        let relays = RelayPlanner::for_pipeline(&pipeline).find_relays(&[s1, p1], &target);

        assert_eq!(relays.len(), 2);
        assert_eq!(relays[0].input_grounding.topic(), "topic.s1");
        assert_eq!(relays[1].input_grounding.topic(), "topic.p1");
        assert_eq!(relays[1].name, "p1 (Stream Relay)");
        assert_eq!(relays[1].output_relays[0].grounding, grounding("n2", "topic.p1"));
    }

    #[test]
    fn test_find_relays_skips_same_node_predecessors() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n2"));
        pipeline.processors.push(processor("p1", "n2", &["s1"]));
        pipeline.sinks.push(sink("k1", "n2", &["s1", "p1"]));
        annotate_output_relays(&mut pipeline);

        let graph = build_graph(&pipeline);
        let predecessors = [graph.entity("s1").unwrap(), graph.entity("p1").unwrap()];

        let relays = RelayPlanner::for_pipeline(&pipeline).find_relays(&predecessors, &pipeline.sinks[0]);
        assert!(relays.is_empty());
    }
}
