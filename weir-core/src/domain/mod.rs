//! Core domain types
//!
//! This module contains the core domain structures used across Weir services.
//! These types describe a pipeline graph (streams, processors, sinks), the
//! relays inserted between nodes, and the status reported for every
//! lifecycle operation.

pub mod element;
pub mod pipeline;
pub mod relay;
pub mod status;
