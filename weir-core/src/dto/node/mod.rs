//! Node DTOs
//!
//! Payloads exchanged with execution nodes when invoking or detaching
//! elements, datasets and relays.

use serde::{Deserialize, Serialize};

/// Response of a node to an invoke or detach call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub element_id: String,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// Set by a node when a detach targets an instance it is not running
    #[serde(default)]
    pub not_running: bool,
}

impl NodeResponse {
    pub fn ok(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            success: true,
            message: String::new(),
            not_running: false,
        }
    }

    pub fn rejected(element_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            success: false,
            message: message.into(),
            not_running: false,
        }
    }
}
