//! Job API Handlers
//!
//! Run and cancel requests, forwarded to the single-slot controller.

use axum::{Json, body::Bytes, extract::State};
use opal_core::domain::job::Job;
use opal_core::dto::job::RunJobRequest;

use crate::api::error::ApiResult;
use crate::controller::JobController;

/// POST /run
/// Admit a job and start running it; returns the pre-run document
///
/// The body is parsed leniently so that a missing or unparsable id is
/// reported as an invalid job id rather than a body rejection.
pub async fn run_job(State(controller): State<JobController>, body: Bytes) -> ApiResult<Json<Job>> {
    let request: RunJobRequest = serde_json::from_slice(&body).unwrap_or_default();
    tracing::info!("Run requested for job {:?}", request.job_id);

    let job = controller.run(request.job_id.as_deref()).await?;
    Ok(Json(job))
}

/// POST /cancel
/// Cancel the running job; returns the finalized document
pub async fn cancel_job(State(controller): State<JobController>) -> ApiResult<Json<Job>> {
    tracing::info!("Cancel requested");

    let job = controller.cancel().await?;
    Ok(Json(job))
}
