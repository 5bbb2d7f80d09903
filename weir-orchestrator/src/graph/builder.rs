use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use weir_core::domain::element::NamedEntity;
use weir_core::domain::pipeline::Pipeline;

/// Graph of one pipeline snapshot
///
/// Nodes are stored in a petgraph arena and indexed by DOM id; edges point
/// from producer to consumer.
#[derive(Debug, Clone)]
pub struct PipelineGraph {
    graph: DiGraph<NamedEntity, ()>,
    dom_to_node: HashMap<String, NodeIndex>,
}

impl PipelineGraph {
    /// Build the graph of a pipeline from its `connected_to` lists
    ///
    /// Connections that do not resolve to an entity of the pipeline are
    /// omitted. Validation of malformed pipelines happens elsewhere.
    pub fn build(pipeline: &Pipeline) -> Self {
        let mut graph = DiGraph::new();
        let mut dom_to_node = HashMap::new();

        let entities = pipeline
            .streams
            .iter()
            .cloned()
            .map(NamedEntity::Stream)
            .chain(pipeline.invocables().cloned().map(NamedEntity::Invocable));

        for entity in entities {
            if dom_to_node.contains_key(entity.dom_id()) {
                tracing::warn!(
                    "Duplicate DOM id {} in pipeline {}, keeping the first entity",
                    entity.dom_id(),
                    pipeline.id
                );
                continue;
            }
            let dom_id = entity.dom_id().to_string();
            let idx = graph.add_node(entity);
            dom_to_node.insert(dom_id, idx);
        }

        for consumer in pipeline.invocables() {
            let consumer_idx = dom_to_node[&consumer.dom_id];
            for producer in &consumer.connected_to {
                match dom_to_node.get(producer) {
                    Some(&producer_idx) => {
                        graph.update_edge(producer_idx, consumer_idx, ());
                    }
                    None => tracing::debug!(
                        "Omitting edge {} -> {}: producer not in pipeline {}",
                        producer,
                        consumer.dom_id,
                        pipeline.id
                    ),
                }
            }
        }

        Self { graph, dom_to_node }
    }

    pub fn entity(&self, dom_id: &str) -> Option<&NamedEntity> {
        self.dom_to_node.get(dom_id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, dom_id: &str) -> bool {
        self.dom_to_node.contains_key(dom_id)
    }

    /// Targets of the outgoing edges of `dom_id`, in connection order
    pub fn outgoing(&self, dom_id: &str) -> Vec<&NamedEntity> {
        self.neighbors(dom_id, Direction::Outgoing)
    }

    /// Sources of the incoming edges of `dom_id`, in connection order
    pub fn incoming(&self, dom_id: &str) -> Vec<&NamedEntity> {
        self.neighbors(dom_id, Direction::Incoming)
    }

    /// All stream entities, in declaration order
    pub fn streams(&self) -> Vec<&NamedEntity> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .filter(|entity| entity.is_stream())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    fn neighbors(&self, dom_id: &str, direction: Direction) -> Vec<&NamedEntity> {
        let Some(&idx) = self.dom_to_node.get(dom_id) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first
        let mut neighbors: Vec<&NamedEntity> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| &self.graph[n])
            .collect();
        neighbors.reverse();
        neighbors
    }
}

/// Build the graph of a pipeline
pub fn build_graph(pipeline: &Pipeline) -> PipelineGraph {
    PipelineGraph::build(pipeline)
}

/// All stream sources (graph roots) of a graph
pub fn find_streams(graph: &PipelineGraph) -> Vec<&NamedEntity> {
    graph.streams()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{processor, sink, stream};

    #[test]
    fn test_build_adds_edge_per_resolved_connection() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1"]));
        pipeline.sinks.push(sink("k1", "n2", &["p1"]));

        let graph = build_graph(&pipeline);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let successors: Vec<_> = graph.outgoing("s1").iter().map(|e| e.dom_id()).collect();
        assert_eq!(successors, vec!["p1"]);
        let producers: Vec<_> = graph.incoming("k1").iter().map(|e| e.dom_id()).collect();
        assert_eq!(producers, vec!["p1"]);
    }

    #[test]
    fn test_unresolved_connection_is_omitted() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.sinks.push(sink("k1", "n1", &["s1", "ghost"]));

        let graph = build_graph(&pipeline);

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.entity("ghost").is_none());
    }

    #[test]
    fn test_find_streams_returns_roots_in_declaration_order() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.streams.push(stream("s2", "n2"));
        pipeline.sinks.push(sink("k1", "n1", &["s1", "s2"]));

        let graph = build_graph(&pipeline);
        let streams: Vec<_> = find_streams(&graph).iter().map(|e| e.dom_id()).collect();

        assert_eq!(streams, vec!["s1", "s2"]);
        let successors: Vec<_> = graph.outgoing("s2").iter().map(|e| e.dom_id()).collect();
        assert_eq!(successors, vec!["k1"]);
    }

    #[test]
    fn test_multiple_outputs_keep_connection_order() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1"]));
        pipeline.processors.push(processor("p2", "n1", &["s1"]));
        pipeline.sinks.push(sink("k1", "n1", &["s1"]));

        let graph = build_graph(&pipeline);
        let successors: Vec<_> = graph.outgoing("s1").iter().map(|e| e.dom_id()).collect();

        assert_eq!(successors, vec!["p1", "p2", "k1"]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut pipeline = Pipeline::new("p", "alice");
        pipeline.streams.push(stream("s1", "n1"));
        pipeline.processors.push(processor("p1", "n1", &["s1", "p2"]));
        pipeline.processors.push(processor("p2", "n1", &["p1"]));

        assert!(build_graph(&pipeline).is_cyclic());
    }
}
