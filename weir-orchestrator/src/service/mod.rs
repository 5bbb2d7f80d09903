//! Service Module
//!
//! Business logic layer for the orchestrator.
//! The executor drives pipeline lifecycles; the other services are the state
//! and collaborators it is wired with.

pub mod executor;
pub mod migration;
pub mod registry;
pub mod saga;
pub mod secrets;
pub mod status;

// Re-export for convenience
pub use executor::{ExecutorError, PipelineExecutor};
pub use migration::MigrationTarget;
pub use registry::{RunningGraph, RunningGraphRegistry};
pub use secrets::{CredentialService, HttpCredentialService, UnavailableCredentials};
pub use status::{InMemoryStatusSink, MonitoringRegistry, StatusSink};
