//! Running-Graph Registry
//!
//! What is deployed for each running pipeline, as recorded by the last
//! successful start or migration. Stop and migrate read from here rather
//! than from the stored definition, which may have been edited since.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;
use weir_core::domain::element::{DataStream, ElementKind, InvocableElement};
use weir_core::domain::pipeline::Pipeline;
use weir_core::dto::pipeline::RunningGraphSummary;

/// Deployment recorded for one pipeline
#[derive(Debug, Clone)]
pub struct RunningGraph {
    pub elements: Vec<InvocableElement>,
    pub datasets: Vec<DataStream>,
    /// Streams the elements were planned against, kept for relay planning on stop
    pub streams: Vec<DataStream>,
    pub deployed_at: DateTime<Utc>,
}

impl RunningGraph {
    pub fn new(elements: Vec<InvocableElement>, datasets: Vec<DataStream>, streams: Vec<DataStream>) -> Self {
        Self {
            elements,
            datasets,
            streams,
            deployed_at: Utc::now(),
        }
    }

    pub fn find_element(&self, dom_id: &str) -> Option<&InvocableElement> {
        self.elements.iter().find(|element| element.dom_id == dom_id)
    }

    /// The recorded deployment as a pipeline with `definition`'s identity
    ///
    /// Only id, name, owner and relay strategy are taken from `definition`;
    /// streams and elements are the ones actually deployed.
    pub fn to_pipeline(&self, definition: &Pipeline) -> Pipeline {
        let (processors, sinks): (Vec<_>, Vec<_>) = self
            .elements
            .iter()
            .cloned()
            .partition(|element| element.kind == ElementKind::Processor);
        Pipeline {
            streams: self.streams.clone(),
            processors,
            sinks,
            ..definition.clone()
        }
    }

    pub fn summary(&self, pipeline_id: Uuid) -> RunningGraphSummary {
        RunningGraphSummary {
            pipeline_id,
            deployed_at: self.deployed_at,
            elements: self.elements.clone(),
            datasets: self.datasets.clone(),
        }
    }
}

/// Registry of running graphs, one instance per orchestrator
#[derive(Debug, Default)]
pub struct RunningGraphRegistry {
    graphs: DashMap<Uuid, RunningGraph>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RunningGraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the deployment of a pipeline
    pub fn put(&self, pipeline_id: Uuid, graph: RunningGraph) {
        tracing::debug!(
            "Recording running graph for pipeline {} ({} elements, {} datasets)",
            pipeline_id,
            graph.elements.len(),
            graph.datasets.len()
        );
        self.graphs.insert(pipeline_id, graph);
    }

    pub fn get(&self, pipeline_id: Uuid) -> Option<RunningGraph> {
        self.graphs.get(&pipeline_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, pipeline_id: Uuid) -> Option<RunningGraph> {
        self.graphs.remove(&pipeline_id).map(|(_, graph)| graph)
    }

    pub fn contains(&self, pipeline_id: Uuid) -> bool {
        self.graphs.contains_key(&pipeline_id)
    }

    /// Ids of every pipeline with a recorded deployment
    pub fn pipelines(&self) -> Vec<Uuid> {
        self.graphs.iter().map(|entry| *entry.key()).collect()
    }

    /// Exclusive lifecycle lock for one pipeline
    ///
    /// Held for the whole of a start, stop or migration so operations on the
    /// same pipeline never interleave. Operations on other pipelines are not
    /// blocked.
    pub async fn lock(&self, pipeline_id: Uuid) -> OwnedMutexGuard<()> {
        // an entry only the map references is neither held nor awaited
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        // clone the Arc so no map guard is held across the await
        let lock = self
            .locks
            .entry(pipeline_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dataset, processor, sink, stream};
    use std::time::Duration;

    #[test]
    fn test_recorded_graph_as_pipeline() {
        let mut definition = weir_core::domain::pipeline::Pipeline::new("chain", "alice");
        definition.sinks.push(sink("edited", "n9", &[]));
        let graph = RunningGraph::new(
            vec![processor("p1", "n1", &["s1"]), sink("k1", "n2", &["p1"])],
            vec![],
            vec![stream("s1", "n1")],
        );

        let pipeline = graph.to_pipeline(&definition);

        assert_eq!(pipeline.id, definition.id);
        assert_eq!(pipeline.created_by_user, "alice");
        assert_eq!(pipeline.streams[0].dom_id, "s1");
        assert_eq!(pipeline.processors[0].dom_id, "p1");
        let sinks: Vec<_> = pipeline.sinks.iter().map(|s| s.dom_id.as_str()).collect();
        assert_eq!(sinks, vec!["k1"]);
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let registry = RunningGraphRegistry::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let held = registry.lock(first).await;
        drop(registry.lock(second).await);
        let third = registry.lock(Uuid::new_v4()).await;
        // first is still held, second was released
        assert!(registry.locks.contains_key(&first));
        assert!(!registry.locks.contains_key(&second));
        assert_eq!(registry.locks.len(), 2);

        drop(held);
        drop(third);
        drop(registry.lock(second).await);
        assert!(!registry.locks.contains_key(&first));
    }

    #[test]
    fn test_put_get_remove() {
        let registry = RunningGraphRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.get(id).is_none());

        registry.put(
            id,
            RunningGraph::new(vec![sink("k1", "n1", &[])], vec![dataset("d1", "n1")], vec![]),
        );

        assert!(registry.contains(id));
        assert_eq!(registry.pipelines(), vec![id]);
        let graph = registry.get(id).unwrap();
        assert!(graph.find_element("k1").is_some());
        assert_eq!(graph.summary(id).datasets.len(), 1);

        assert!(registry.remove(id).is_some());
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn test_lock_serializes_one_pipeline_only() {
        let registry = Arc::new(RunningGraphRegistry::new());
        let id = Uuid::new_v4();

        let guard = registry.lock(id).await;

        // another pipeline is not blocked
        let other = tokio::time::timeout(Duration::from_millis(100), registry.lock(Uuid::new_v4())).await;
        assert!(other.is_ok());

        // the same pipeline waits until the guard is dropped
        let same = tokio::time::timeout(Duration::from_millis(50), registry.lock(id)).await;
        assert!(same.is_err());

        drop(guard);
        let same = tokio::time::timeout(Duration::from_millis(100), registry.lock(id)).await;
        assert!(same.is_ok());
    }
}
