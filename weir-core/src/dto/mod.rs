//! Data Transfer Objects for inter-service communication
//!
//! This module contains DTOs exchanged between the orchestrator, execution
//! nodes and API clients (CLI).

pub mod node;
pub mod pipeline;
