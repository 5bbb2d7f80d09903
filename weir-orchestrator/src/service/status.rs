//! Lifecycle status messages and monitoring observers

use dashmap::DashSet;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;
use weir_core::domain::status::PipelineStatusMessage;

/// Receives pipeline lifecycle messages
pub trait StatusSink: Send + Sync {
    fn publish(&self, message: PipelineStatusMessage);

    /// Messages recorded for a pipeline, oldest first
    fn history(&self, pipeline_id: Uuid) -> Vec<PipelineStatusMessage>;
}

/// Keeps the most recent messages of every pipeline in memory
#[derive(Debug)]
pub struct InMemoryStatusSink {
    limit: usize,
    messages: Mutex<HashMap<Uuid, VecDeque<PipelineStatusMessage>>>,
}

impl InMemoryStatusSink {
    /// # Arguments
    /// * `limit` - Messages kept per pipeline; older ones are dropped
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            messages: Mutex::new(HashMap::new()),
        }
    }
}

impl StatusSink for InMemoryStatusSink {
    fn publish(&self, message: PipelineStatusMessage) {
        tracing::info!(
            "Pipeline {}: {} ({})",
            message.pipeline_id,
            message.title,
            message.timestamp
        );

        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let history = messages.entry(message.pipeline_id).or_default();
        if history.len() == self.limit {
            history.pop_front();
        }
        history.push_back(message);
    }

    fn history(&self, pipeline_id: Uuid) -> Vec<PipelineStatusMessage> {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages
            .get(&pipeline_id)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Pipelines with a registered monitoring observer
#[derive(Debug, Default)]
pub struct MonitoringRegistry {
    observed: DashSet<Uuid>,
}

impl MonitoringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&self, pipeline_id: Uuid) {
        if self.observed.insert(pipeline_id) {
            tracing::debug!("Monitoring observer registered for pipeline {}", pipeline_id);
        }
    }

    pub fn remove_observer(&self, pipeline_id: Uuid) {
        if self.observed.remove(&pipeline_id).is_some() {
            tracing::debug!("Monitoring observer removed for pipeline {}", pipeline_id);
        }
    }

    pub fn is_observed(&self, pipeline_id: Uuid) -> bool {
        self.observed.contains(&pipeline_id)
    }
}
