//! API Module
//!
//! HTTP control surface of the compute node.

pub mod error;
pub mod health;
pub mod job;
pub mod node;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::controller::JobController;

/// Create the main API router with all endpoints
pub fn create_router(controller: JobController) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/run", post(job::run_job))
        .route("/cancel", post(job::cancel_job))
        // Node endpoints
        .route("/status", get(node::get_status))
        // Add state and middleware
        .with_state(controller)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{Harness, StubRuntime};
    use opal_client::ComputeClient;
    use opal_core::domain::job::JobStatus;
    use opal_core::domain::node::NodeStatus;

    async fn serve(controller: JobController) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(controller)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new();
        let url = serve(JobController::new(harness.registry(StubRuntime::script("true")))).await;

        let response = reqwest::get(format!("{}/health", url)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_run_and_status() {
        let harness = Harness::new();
        let job = harness.job();
        let url = serve(JobController::new(harness.registry(StubRuntime::script("sleep 2")))).await;
        let client = ComputeClient::new(url);

        assert_eq!(client.status().await.unwrap().status, NodeStatus::Idle);

        let returned = client.run_job(job.id).await.unwrap();
        assert_eq!(returned.id, job.id);
        assert_eq!(returned.current_status(), Some(JobStatus::Created));

        let status = client.status().await.unwrap();
        assert_eq!(status.status, NodeStatus::Busy);
        assert_eq!(status.job_id, Some(job.id));

        let busy = client.run_job(job.id).await.unwrap_err();
        assert_eq!(busy.status(), Some(503));
    }

    #[tokio::test]
    async fn test_run_without_job_id_is_bad_request() {
        let harness = Harness::new();
        let url = serve(JobController::new(harness.registry(StubRuntime::script("true")))).await;
        let http = reqwest::Client::new();

        for body in ["", "{}", "{\"job_id\": 12}", "not json"] {
            let response = http
                .post(format!("{}/run", url))
                .body(body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400, "body {:?}", body);
        }
    }

    #[tokio::test]
    async fn test_run_unknown_job_is_server_error() {
        let harness = Harness::new();
        let url = serve(JobController::new(harness.registry(StubRuntime::script("true")))).await;
        let client = ComputeClient::new(url);

        let err = client.run_job(uuid::Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(client.status().await.unwrap().status, NodeStatus::Idle);
    }

    #[tokio::test]
    async fn test_cancel_without_job() {
        let harness = Harness::new();
        let url = serve(JobController::new(harness.registry(StubRuntime::script("true")))).await;

        let response = reqwest::Client::new()
            .post(format!("{}/cancel", url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Not currently running a job");
    }
}
