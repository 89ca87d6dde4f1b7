//! Job DTOs for the compute node control surface

use serde::{Deserialize, Serialize};

/// Request to run a job on a compute node
///
/// The id is kept as a raw string so that a missing or malformed id can be
/// reported as a client error instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunJobRequest {
    pub job_id: Option<String>,
}

/// Error body returned by the compute node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
