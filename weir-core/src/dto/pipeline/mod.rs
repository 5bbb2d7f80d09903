//! Pipeline DTOs for inter-service communication

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::element::{DataStream, InvocableElement};
use crate::domain::pipeline::Pipeline;

fn default_true() -> bool {
    true
}

/// Side effects requested alongside a start or stop
///
/// The flags are orthogonal: each toggles one follow-up action and none of
/// them changes how elements are deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Delete visualization state on stop
    #[serde(default = "default_true")]
    pub visualize: bool,
    /// Persist `running` / `started_at` in the pipeline store
    #[serde(default = "default_true")]
    pub store_status: bool,
    /// Register (start) or unregister (stop) a monitoring observer
    #[serde(default = "default_true")]
    pub monitor: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            visualize: true,
            store_status: true,
            monitor: true,
        }
    }
}

/// Request to replace one running element with an element of an edited pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateElement {
    /// Edited pipeline definition containing the target element
    pub pipeline: Pipeline,
    /// DOM id of the replacement element in `pipeline`
    pub target_dom_id: String,
    /// DOM id of the running element being replaced
    pub origin_dom_id: String,
}

/// What the orchestrator currently has deployed for a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningGraphSummary {
    pub pipeline_id: Uuid,
    pub deployed_at: DateTime<Utc>,
    pub elements: Vec<InvocableElement>,
    pub datasets: Vec<DataStream>,
}

/// Short listing entry for a stored pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub created_by_user: String,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub element_count: usize,
}

impl From<&Pipeline> for PipelineSummary {
    fn from(pipeline: &Pipeline) -> Self {
        PipelineSummary {
            id: pipeline.id,
            name: pipeline.name.clone(),
            created_by_user: pipeline.created_by_user.clone(),
            running: pipeline.running,
            started_at: pipeline.started_at,
            element_count: pipeline.processors.len() + pipeline.sinks.len(),
        }
    }
}
