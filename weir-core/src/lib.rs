//! Weir Core
//!
//! Core types and abstractions for the Weir stream pipeline orchestrator.
//!
//! This crate contains:
//! - Domain types: pipelines, graph entities, relays and operation status
//! - DTOs: Data transfer objects exchanged with execution nodes and API clients

pub mod domain;
pub mod dto;
