//! Saga driver
//!
//! Runs a fixed list of forward steps. When a step fails, its own partial
//! effects are undone first, then every previously committed step is
//! compensated in reverse order. Compensations are never themselves rolled
//! back; their failures only show up in the status.

use async_trait::async_trait;
use tracing::{info, warn};
use weir_core::domain::status::PipelineOperationStatus;

/// One forward step and the actions that undo it
#[async_trait]
pub trait SagaStep: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self) -> PipelineOperationStatus;

    /// Undo what a failed `execute` did manage to do
    ///
    /// Receives the status of the failed attempt so only the parts that
    /// succeeded are reverted.
    async fn recover(&self, _attempt: &PipelineOperationStatus) -> Option<PipelineOperationStatus> {
        None
    }

    /// Undo a committed step
    async fn compensate(&self) -> Option<PipelineOperationStatus> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Completed,
    RolledBack {
        failed_step: String,
        /// Steps compensated, in the order they were compensated
        compensated: Vec<String>,
    },
}

impl SagaOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SagaOutcome::Completed)
    }
}

#[derive(Default)]
pub struct Saga {
    steps: Vec<Box<dyn SagaStep>>,
}

impl Saga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl SagaStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Run every step in order, appending each status to `status`
    pub async fn run(&self, status: &mut PipelineOperationStatus) -> SagaOutcome {
        for (index, step) in self.steps.iter().enumerate() {
            let attempt = step.execute().await;
            let failed = !attempt.success;
            status.absorb(attempt.clone());

            if !failed {
                continue;
            }

            warn!("Step '{}' failed, rolling back", step.name());
            if let Some(recovered) = step.recover(&attempt).await {
                status.absorb(recovered);
            }

            let mut compensated = Vec::new();
            for committed in self.steps[..index].iter().rev() {
                if let Some(undone) = committed.compensate().await {
                    status.absorb(undone);
                }
                compensated.push(committed.name().to_string());
            }

            info!(
                "Rolled back after '{}' ({} steps compensated)",
                step.name(),
                compensated.len()
            );
            return SagaOutcome::RolledBack {
                failed_step: step.name().to_string(),
                compensated,
            };
        }

        SagaOutcome::Completed
    }
}
