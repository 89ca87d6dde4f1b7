//! Node status tracker

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use opal_core::domain::node::NodeStatus;
use opal_core::dto::node::NodeStatusResponse;
use uuid::Uuid;

/// Busy/idle flag of the node, read by the status endpoint
pub struct StatusTracker {
    state: RwLock<NodeState>,
}

struct NodeState {
    status: NodeStatus,
    since: DateTime<Utc>,
    job_id: Option<Uuid>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(NodeState {
                status: NodeStatus::Idle,
                since: Utc::now(),
                job_id: None,
            }),
        }
    }

    pub fn mark_busy(&self, job_id: Uuid) {
        let mut state = self.state.write().unwrap();
        state.status = NodeStatus::Busy;
        state.since = Utc::now();
        state.job_id = Some(job_id);
    }

    pub fn mark_idle(&self) {
        let mut state = self.state.write().unwrap();
        if state.status == NodeStatus::Idle {
            return;
        }
        state.status = NodeStatus::Idle;
        state.since = Utc::now();
        state.job_id = None;
    }

    pub fn snapshot(&self) -> NodeStatusResponse {
        let state = self.state.read().unwrap();
        NodeStatusResponse {
            status: state.status,
            since: state.since,
            job_id: state.job_id,
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
