//! Node DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::node::NodeStatus;

/// Current availability of a compute node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub status: NodeStatus,

    /// When the status last changed
    pub since: DateTime<Utc>,

    /// Job occupying the slot, if any
    pub job_id: Option<Uuid>,
}
