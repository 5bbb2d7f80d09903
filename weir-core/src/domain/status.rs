//! Operation status and lifecycle messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of one remote call for one element, dataset or relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineElementStatus {
    pub element_id: String,
    pub element_name: String,
    pub success: bool,
    pub message: String,
}

impl PipelineElementStatus {
    pub fn succeeded(
        element_id: impl Into<String>,
        element_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            element_name: element_name.into(),
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(
        element_id: impl Into<String>,
        element_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            element_name: element_name.into(),
            success: false,
            message: message.into(),
        }
    }
}

/// Non-fatal condition observed during an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationWarning {
    /// A secret property was deployed without being decrypted
    SecretLeftEncrypted {
        element_id: String,
        property: String,
        reason: String,
    },
    /// The pipeline definition could not be updated after the deployment
    PersistenceFailed { message: String },
    /// A predecessor of the migrated element has no counterpart in the running graph
    UnmatchedPredecessor { dom_id: String },
}

/// Aggregate result of one lifecycle operation
///
/// Every attempted remote call appends one element status, including
/// rollback calls, so the list is a full audit trail of the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOperationStatus {
    pub pipeline_id: Uuid,
    pub pipeline_name: String,
    pub success: bool,
    pub element_status: Vec<PipelineElementStatus>,
    #[serde(default)]
    pub warnings: Vec<OperationWarning>,
}

impl PipelineOperationStatus {
    /// Empty status; succeeds until a failed element is added
    pub fn new(pipeline_id: Uuid, pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_id,
            pipeline_name: pipeline_name.into(),
            success: true,
            element_status: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_elements(
        pipeline_id: Uuid,
        pipeline_name: impl Into<String>,
        element_status: Vec<PipelineElementStatus>,
    ) -> Self {
        let mut status = Self::new(pipeline_id, pipeline_name);
        status.element_status = element_status;
        status.refresh_success();
        status
    }

    pub fn add_element_status(&mut self, element: PipelineElementStatus) {
        self.success &= element.success;
        self.element_status.push(element);
    }

    /// Append every element status and warning of another status
    pub fn absorb(&mut self, other: PipelineOperationStatus) {
        for element in other.element_status {
            self.add_element_status(element);
        }
        self.warnings.extend(other.warnings);
    }

    pub fn add_warning(&mut self, warning: OperationWarning) {
        self.warnings.push(warning);
    }

    /// Recompute `success` as the conjunction of every element status
    pub fn refresh_success(&mut self) {
        self.success = self.element_status.iter().all(|element| element.success);
    }

    /// Ids of the elements whose call succeeded
    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.element_status
            .iter()
            .filter(|element| element.success)
            .map(|element| element.element_id.as_str())
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.element_status.iter().filter(|element| !element.success).count()
    }
}

/// Kind of lifecycle message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatusMessageType {
    PipelineStarted,
    PipelineStopped,
    ElementMigrated,
}

impl PipelineStatusMessageType {
    pub fn title(&self) -> &'static str {
        match self {
            PipelineStatusMessageType::PipelineStarted => "Pipeline started",
            PipelineStatusMessageType::PipelineStopped => "Pipeline stopped",
            PipelineStatusMessageType::ElementMigrated => "Element migrated",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PipelineStatusMessageType::PipelineStarted => "Pipeline successfully started",
            PipelineStatusMessageType::PipelineStopped => "Pipeline successfully stopped",
            PipelineStatusMessageType::ElementMigrated => {
                "Pipeline element successfully migrated to a new node"
            }
        }
    }
}

impl std::fmt::Display for PipelineStatusMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Lifecycle notification consumed by monitoring collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatusMessage {
    pub pipeline_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message_type: PipelineStatusMessageType,
    pub title: String,
    pub description: String,
}

impl PipelineStatusMessage {
    pub fn now(pipeline_id: Uuid, message_type: PipelineStatusMessageType) -> Self {
        Self {
            pipeline_id,
            timestamp: Utc::now(),
            message_type,
            title: message_type.title().to_string(),
            description: message_type.description().to_string(),
        }
    }
}
