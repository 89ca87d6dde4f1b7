//! Node API Handlers

use axum::{Json, extract::State};
use opal_core::dto::node::NodeStatusResponse;

use crate::controller::JobController;

/// GET /status
/// Busy/idle status of the node
pub async fn get_status(State(controller): State<JobController>) -> Json<NodeStatusResponse> {
    Json(controller.status())
}
