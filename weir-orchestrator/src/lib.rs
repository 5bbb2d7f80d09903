//! Weir orchestrator
//!
//! Turns pipeline definitions into running element instances on execution
//! nodes and reconfigures them while data flows:
//! - [`graph`]: pipeline graph construction and traversal
//! - [`relay`]: which edges need a cross-node relay
//! - [`submitter`]: invoke/detach calls against execution nodes
//! - [`service`]: executor, running-graph registry, secrets, status, saga
//! - [`repository`]: durable pipeline definitions
//! - [`api`]: HTTP endpoints

pub mod api;
pub mod config;
pub mod db;
pub mod graph;
pub mod relay;
pub mod repository;
pub mod service;
pub mod submitter;

#[cfg(test)]
mod testing;
