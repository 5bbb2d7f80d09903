//! Migration steps
//!
//! Replacing a running element is four saga steps: start the replacement,
//! stop the relays feeding the origin, start the relays feeding the
//! replacement, stop the origin.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weir_core::domain::element::InvocableElement;
use weir_core::domain::relay::RelayContainer;
use weir_core::domain::status::PipelineOperationStatus;

use crate::service::saga::{Saga, SagaStep};
use crate::submitter::{DeploymentBatch, GraphSubmitter, PipelineScope, succeeded_relays};

/// Which element replaces which
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationTarget {
    /// DOM id of the replacement in the edited pipeline
    pub target_dom_id: String,
    /// DOM id of the running element being replaced
    pub origin_dom_id: String,
}

/// Everything a migration touches, resolved before the first remote call
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub scope: PipelineScope,
    /// Replacement, with secrets decrypted
    pub target: InvocableElement,
    pub origin: InvocableElement,
    /// Relays currently feeding the origin
    pub old_relays: Vec<RelayContainer>,
    /// Relays that will feed the replacement
    pub new_relays: Vec<RelayContainer>,
}

impl MigrationPlan {
    pub fn into_saga(self, submitter: Arc<dyn GraphSubmitter>) -> Saga {
        Saga::new()
            .step(StartTarget {
                submitter: submitter.clone(),
                scope: self.scope.clone(),
                target: self.target,
            })
            .step(StopRelays {
                submitter: submitter.clone(),
                scope: self.scope.clone(),
                relays: self.old_relays,
            })
            .step(StartRelays {
                submitter: submitter.clone(),
                scope: self.scope.clone(),
                relays: self.new_relays,
            })
            .step(StopOrigin {
                submitter,
                scope: self.scope,
                origin: self.origin,
            })
    }
}

struct StartTarget {
    submitter: Arc<dyn GraphSubmitter>,
    scope: PipelineScope,
    target: InvocableElement,
}

#[async_trait]
impl SagaStep for StartTarget {
    fn name(&self) -> &str {
        "start target"
    }

    async fn execute(&self) -> PipelineOperationStatus {
        let batch = DeploymentBatch::elements(vec![self.target.clone()]);
        self.submitter.invoke_graphs(&self.scope, &batch).await
    }

    async fn compensate(&self) -> Option<PipelineOperationStatus> {
        let batch = DeploymentBatch::elements(vec![self.target.clone()]);
        Some(self.submitter.detach_graphs(&self.scope, &batch).await)
    }
}

struct StopRelays {
    submitter: Arc<dyn GraphSubmitter>,
    scope: PipelineScope,
    relays: Vec<RelayContainer>,
}

#[async_trait]
impl SagaStep for StopRelays {
    fn name(&self) -> &str {
        "stop old relays"
    }

    async fn execute(&self) -> PipelineOperationStatus {
        self.submitter.detach_relays(&self.scope, &self.relays).await
    }

    /// Restart the relays that were already torn down
    async fn recover(&self, attempt: &PipelineOperationStatus) -> Option<PipelineOperationStatus> {
        let stopped = succeeded_relays(&self.relays, attempt);
        if stopped.is_empty() {
            return None;
        }
        Some(self.submitter.invoke_relays(&self.scope, &stopped).await)
    }

    async fn compensate(&self) -> Option<PipelineOperationStatus> {
        if self.relays.is_empty() {
            return None;
        }
        Some(self.submitter.invoke_relays(&self.scope, &self.relays).await)
    }
}

struct StartRelays {
    submitter: Arc<dyn GraphSubmitter>,
    scope: PipelineScope,
    relays: Vec<RelayContainer>,
}

#[async_trait]
impl SagaStep for StartRelays {
    fn name(&self) -> &str {
        "start new relays"
    }

    async fn execute(&self) -> PipelineOperationStatus {
        self.submitter.invoke_relays(&self.scope, &self.relays).await
    }

    /// Detach the relays that did start
    async fn recover(&self, attempt: &PipelineOperationStatus) -> Option<PipelineOperationStatus> {
        let started = succeeded_relays(&self.relays, attempt);
        if started.is_empty() {
            return None;
        }
        Some(self.submitter.detach_relays(&self.scope, &started).await)
    }

    async fn compensate(&self) -> Option<PipelineOperationStatus> {
        if self.relays.is_empty() {
            return None;
        }
        Some(self.submitter.detach_relays(&self.scope, &self.relays).await)
    }
}

struct StopOrigin {
    submitter: Arc<dyn GraphSubmitter>,
    scope: PipelineScope,
    origin: InvocableElement,
}

#[async_trait]
impl SagaStep for StopOrigin {
    fn name(&self) -> &str {
        "stop origin"
    }

    async fn execute(&self) -> PipelineOperationStatus {
        let batch = DeploymentBatch::elements(vec![self.origin.clone()]);
        self.submitter.detach_graphs(&self.scope, &batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::saga::SagaOutcome;
    use crate::testing::{Call, ScriptedSubmitter, grounding, sink, target};
    use uuid::Uuid;
    use weir_core::domain::pipeline::RelayStrategy;

    fn relay(pipeline_id: Uuid, topic: &str) -> RelayContainer {
        let mut relay = RelayContainer::new(
            pipeline_id,
            RelayStrategy::Buffer,
            topic,
            grounding("n1", topic),
            target("n1"),
        );
        relay.add_output(grounding("n2", topic));
        relay
    }

    fn plan() -> MigrationPlan {
        let scope = PipelineScope::new(Uuid::new_v4(), "p");
        MigrationPlan {
            target: sink("new", "n3", &["s1"]),
            origin: sink("old", "n2", &["s1"]),
            old_relays: vec![relay(scope.pipeline_id, "a"), relay(scope.pipeline_id, "b")],
            new_relays: vec![relay(scope.pipeline_id, "c"), relay(scope.pipeline_id, "d")],
            scope,
        }
    }

    fn id(plan: &MigrationPlan, topic: &str) -> String {
        format!("{}/{}", plan.scope.pipeline_id, topic)
    }

    #[tokio::test]
    async fn test_partial_relay_stop_restores_only_stopped_relays() {
        let plan = plan();
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.fail_detach(id(&plan, "b"));
        let mut status = plan.scope.status();

        let outcome = plan.clone().into_saga(submitter.clone()).run(&mut status).await;

        assert!(matches!(outcome, SagaOutcome::RolledBack { ref failed_step, .. } if failed_step == "stop old relays"));
        assert_eq!(
            submitter.calls(),
            vec![
                Call::InvokeGraphs(vec!["new-instance".to_string()]),
                Call::DetachRelays(vec![id(&plan, "a"), id(&plan, "b")]),
                Call::InvokeRelays(vec![id(&plan, "a")]),
                Call::DetachGraphs(vec!["new-instance".to_string()]),
            ]
        );
        assert!(!status.success);
        assert_eq!(status.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_origin_stop_failure_reverses_everything() {
        let plan = plan();
        let submitter = Arc::new(ScriptedSubmitter::new());
        submitter.fail_detach("old-instance");
        let mut status = plan.scope.status();

        plan.clone().into_saga(submitter.clone()).run(&mut status).await;

        let calls = submitter.calls();
        assert_eq!(calls.len(), 7);
        assert_eq!(calls[4], Call::DetachRelays(vec![id(&plan, "c"), id(&plan, "d")]));
        assert_eq!(calls[5], Call::InvokeRelays(vec![id(&plan, "a"), id(&plan, "b")]));
        assert_eq!(calls[6], Call::DetachGraphs(vec!["new-instance".to_string()]));
    }
}
