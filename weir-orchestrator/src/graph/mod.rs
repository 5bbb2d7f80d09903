//! Pipeline graph
//!
//! Directed graph over the named entities of one pipeline snapshot, with
//! edges meaning "produces input to". Built fresh for every operation and
//! never persisted.

mod builder;
mod walk;

pub use builder::{PipelineGraph, build_graph, find_streams};
pub use walk::{GraphError, find_matching, predecessors_of};
