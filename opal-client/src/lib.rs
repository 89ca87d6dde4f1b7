//! OPAL HTTP Clients
//!
//! Type-safe HTTP clients for the services a compute node talks to:
//!
//! - [`AggregationClient`]: lifecycle events of the aggregation/privacy service
//! - [`AlgorithmClient`]: algorithm definitions from the algorithm service
//! - [`ComputeClient`]: the control surface of a compute node (used by the CLI)
//!
//! # Example
//!
//! ```no_run
//! use opal_client::AggregationClient;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AggregationClient::new("http://localhost:3002");
//!     let session = client.session(Uuid::new_v4());
//!
//!     session.start("sum", None).await?;
//!     println!("algorithm streams to {}", session.update_url());
//!     session.finish().await?;
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod algorithms;
pub mod compute;
pub mod error;

// Re-export commonly used types
pub use aggregation::{AggregationClient, AggregationSessionClient};
pub use algorithms::AlgorithmClient;
pub use compute::ComputeClient;
pub use error::{ClientError, Result};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Normalizes a base URL so paths can be appended with a single `/`
pub(crate) fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        return Err(error_from_response(status, response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle a response from a peer that signals success with exactly `200 OK`
///
/// The body is returned as JSON when present, `Null` otherwise.
pub(crate) async fn handle_ok_response(response: reqwest::Response) -> Result<serde_json::Value> {
    let status = response.status();

    if status != StatusCode::OK {
        return Err(error_from_response(status, response).await);
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_str(&body)
        .or_else(|_| Ok(serde_json::Value::String(body)))
}

async fn error_from_response(status: StatusCode, response: reqwest::Response) -> ClientError {
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    ClientError::api_error(status.as_u16(), error_text)
}
