//! Node domain model
//!
//! Availability of a compute node, as consumed by the control plane.

use serde::{Deserialize, Serialize};

/// Status of a compute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Node has a free slot and accepts a job
    Idle,

    /// Node is executing a job
    Busy,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Idle => write!(f, "idle"),
            NodeStatus::Busy => write!(f, "busy"),
        }
    }
}
