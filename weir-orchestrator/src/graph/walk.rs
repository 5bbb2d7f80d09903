//! Depth-first traversals used by element migration

use std::collections::HashSet;
use thiserror::Error;
use weir_core::domain::element::NamedEntity;

use super::builder::PipelineGraph;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("pipeline graph contains a cycle")]
    Cyclic,

    #[error("element {0} is not part of the pipeline graph")]
    UnknownElement(String),
}

/// Entities that directly feed `target_dom_id`, found by walking forward from
/// every stream source
///
/// Sources are visited in declaration order and the walk is depth-first, so
/// the result lists predecessors in the order they are first reached.
pub fn predecessors_of<'g>(
    graph: &'g PipelineGraph,
    target_dom_id: &str,
) -> Result<Vec<&'g NamedEntity>, GraphError> {
    if !graph.contains(target_dom_id) {
        return Err(GraphError::UnknownElement(target_dom_id.to_string()));
    }
    if graph.is_cyclic() {
        return Err(GraphError::Cyclic);
    }

    let mut found: Vec<&NamedEntity> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();

    for source in graph.streams() {
        let mut stack = vec![source];
        while let Some(entity) = stack.pop() {
            if !visited.insert(entity.dom_id()) {
                continue;
            }
            let successors = graph.outgoing(entity.dom_id());
            if successors.iter().any(|s| s.dom_id() == target_dom_id) {
                found.push(entity);
            }
            // push in reverse so the first successor is walked first
            for successor in successors.into_iter().rev() {
                if successor.dom_id() != target_dom_id && !visited.contains(successor.dom_id()) {
                    stack.push(successor);
                }
            }
        }
    }

    Ok(found)
}

/// Counterpart of `entity` in another graph snapshot, matched by DOM id
///
/// Only entities reachable from a stream source are considered.
pub fn find_matching<'g>(entity: &NamedEntity, graph: &'g PipelineGraph) -> Option<&'g NamedEntity> {
    let wanted = entity.dom_id();
    let mut visited: HashSet<&str> = HashSet::new();

    for source in graph.streams() {
        let mut stack = vec![source];
        while let Some(candidate) = stack.pop() {
            if !visited.insert(candidate.dom_id()) {
                continue;
            }
            if candidate.dom_id() == wanted {
                return Some(candidate);
            }
            for successor in graph.outgoing(candidate.dom_id()).into_iter().rev() {
                if !visited.contains(successor.dom_id()) {
                    stack.push(successor);
                }
            }
        }
    }

    None
}
