//! Graph submitter backed by the node HTTP API

use async_trait::async_trait;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use weir_client::{NodeClient, Result as ClientResult};
use weir_core::domain::relay::RelayContainer;
use weir_core::domain::status::{PipelineElementStatus, PipelineOperationStatus};
use weir_core::dto::node::NodeResponse;

use super::{DeploymentBatch, GraphSubmitter, PipelineScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Invoke,
    Detach,
}

impl Op {
    fn verb(self) -> &'static str {
        match self {
            Op::Invoke => "invoked",
            Op::Detach => "detached",
        }
    }
}

/// Submits entities to their nodes with a [`NodeClient`]
///
/// Calls of one phase run concurrently, at most `max_concurrent_calls` at a
/// time across all operations sharing this submitter.
#[derive(Debug, Clone)]
pub struct HttpGraphSubmitter {
    client: NodeClient,
    permits: Arc<Semaphore>,
}

impl HttpGraphSubmitter {
    pub fn new(client: NodeClient, max_concurrent_calls: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent_calls.max(1))),
        }
    }

    async fn call<F>(&self, id: &str, name: &str, op: Op, request: F) -> PipelineElementStatus
    where
        F: Future<Output = ClientResult<NodeResponse>>,
    {
        let Ok(_permit) = self.permits.acquire().await else {
            return PipelineElementStatus::failed(id, name, "node submitter is shut down");
        };
        debug!("{} {} ({})", op.verb(), name, id);
        to_element_status(id, name, op, request.await)
    }

    async fn relay_calls(&self, relays: &[RelayContainer], op: Op) -> Vec<PipelineElementStatus> {
        join_all(relays.iter().map(|relay| async move {
            let id = relay.status_id();
            match op {
                Op::Invoke => self.call(&id, &relay.name, op, self.client.invoke_relay(relay)).await,
                Op::Detach => self.call(&id, &relay.name, op, self.client.detach_relay(relay)).await,
            }
        }))
        .await
    }

    async fn graph_calls(&self, batch: &DeploymentBatch, op: Op) -> Vec<PipelineElementStatus> {
        let elements = join_all(batch.elements.iter().map(|element| async move {
            match op {
                Op::Invoke => {
                    self.call(&element.element_id, &element.name, op, self.client.invoke_element(element))
                        .await
                }
                Op::Detach => {
                    self.call(&element.element_id, &element.name, op, self.client.detach_element(element))
                        .await
                }
            }
        }));
        let datasets = join_all(batch.datasets.iter().map(|dataset| async move {
            match op {
                Op::Invoke => {
                    self.call(&dataset.element_id, &dataset.name, op, self.client.invoke_dataset(dataset))
                        .await
                }
                Op::Detach => {
                    self.call(&dataset.element_id, &dataset.name, op, self.client.detach_dataset(dataset))
                        .await
                }
            }
        }));

        let (mut statuses, datasets) = futures::join!(elements, datasets);
        statuses.extend(datasets);
        statuses
    }
}

/// Map one node call to an element status
///
/// On detach, a 404 or a `not_running` response means there was nothing to
/// stop and counts as success.
fn to_element_status(id: &str, name: &str, op: Op, result: ClientResult<NodeResponse>) -> PipelineElementStatus {
    match result {
        Ok(response) if op == Op::Detach && response.not_running => {
            PipelineElementStatus::succeeded(id, name, "not running")
        }
        Ok(response) if response.success => {
            let message = if response.message.is_empty() {
                op.verb().to_string()
            } else {
                response.message
            };
            PipelineElementStatus::succeeded(id, name, message)
        }
        Ok(response) => {
            warn!("Node rejected {} of {} ({}): {}", op.verb(), name, id, response.message);
            PipelineElementStatus::failed(id, name, response.message)
        }
        Err(err) if op == Op::Detach && err.is_not_found() => {
            PipelineElementStatus::succeeded(id, name, "not running")
        }
        Err(err) => {
            warn!("Node call failed for {} ({}): {}", name, id, err);
            PipelineElementStatus::failed(id, name, err.to_string())
        }
    }
}

fn collect(scope: &PipelineScope, statuses: impl IntoIterator<Item = PipelineElementStatus>) -> PipelineOperationStatus {
    let mut status = scope.status();
    for element in statuses {
        status.add_element_status(element);
    }
    status
}

#[async_trait]
impl GraphSubmitter for HttpGraphSubmitter {
    async fn invoke_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus {
        let mut statuses = self.graph_calls(batch, Op::Invoke).await;
        statuses.extend(self.relay_calls(&batch.relays, Op::Invoke).await);
        collect(scope, statuses)
    }

    async fn detach_graphs(&self, scope: &PipelineScope, batch: &DeploymentBatch) -> PipelineOperationStatus {
        let mut statuses = self.relay_calls(&batch.relays, Op::Detach).await;
        statuses.extend(self.graph_calls(batch, Op::Detach).await);
        collect(scope, statuses)
    }

    async fn invoke_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus {
        collect(scope, self.relay_calls(relays, Op::Invoke).await)
    }

    async fn detach_relays(&self, scope: &PipelineScope, relays: &[RelayContainer]) -> PipelineOperationStatus {
        collect(scope, self.relay_calls(relays, Op::Detach).await)
    }
}
