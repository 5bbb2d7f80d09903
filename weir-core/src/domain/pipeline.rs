//! Pipeline domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::element::{DataStream, InvocableElement};

/// How a relay treats events while its downstream is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelayStrategy {
    #[default]
    Buffer,
    Discard,
}

/// Pipeline definition
///
/// Persisted by the pipeline store between operations and owned by the
/// executor for the duration of one lifecycle operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    /// Owner; secrets are decrypted with this user's credentials
    pub created_by_user: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub relay_strategy: RelayStrategy,
    #[serde(default)]
    pub streams: Vec<DataStream>,
    #[serde(default)]
    pub processors: Vec<InvocableElement>,
    #[serde(default)]
    pub sinks: Vec<InvocableElement>,
    /// Optimistic concurrency token maintained by the pipeline store
    #[serde(default)]
    pub revision: i64,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, created_by_user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_by_user: created_by_user.into(),
            running: false,
            started_at: None,
            relay_strategy: RelayStrategy::default(),
            streams: Vec::new(),
            processors: Vec::new(),
            sinks: Vec::new(),
            revision: 0,
        }
    }

    /// Processors followed by sinks
    pub fn invocables(&self) -> impl Iterator<Item = &InvocableElement> {
        self.processors.iter().chain(self.sinks.iter())
    }

    /// Find a processor or sink by DOM id
    pub fn find_invocable(&self, dom_id: &str) -> Option<&InvocableElement> {
        self.invocables().find(|element| element.dom_id == dom_id)
    }

    /// Copies of the datasets, scoped to this pipeline
    pub fn scoped_datasets(&self) -> Vec<DataStream> {
        self.streams
            .iter()
            .filter(|stream| stream.is_dataset())
            .map(|stream| stream.scoped_to(self.id))
            .collect()
    }
}
