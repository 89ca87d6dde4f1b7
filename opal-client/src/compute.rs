//! Compute node control surface client

use opal_core::domain::job::Job;
use opal_core::dto::job::RunJobRequest;
use opal_core::dto::node::NodeStatusResponse;
use reqwest::Client;
use uuid::Uuid;

use crate::error::Result;
use crate::{handle_response, normalize_base_url};

/// HTTP client for a compute node
#[derive(Debug, Clone)]
pub struct ComputeClient {
    base_url: String,
    client: Client,
}

impl ComputeClient {
    /// Create a new compute client
    ///
    /// # Example
    /// ```
    /// use opal_client::ComputeClient;
    ///
    /// let client = ComputeClient::new("http://localhost:8080");
    /// assert_eq!(client.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new compute client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
        }
    }

    /// Get the base URL of the compute node
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the node to run a job
    ///
    /// # Returns
    /// The job document as it was before execution started
    pub async fn run_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/run", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RunJobRequest {
                job_id: Some(job_id.to_string()),
            })
            .send()
            .await?;

        handle_response(response).await
    }

    /// Interrupt the job currently running on the node
    ///
    /// # Returns
    /// The finalized job document
    pub async fn cancel_job(&self) -> Result<Job> {
        let url = format!("{}/cancel", self.base_url);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }

    /// Get the node's availability
    pub async fn status(&self) -> Result<NodeStatusResponse> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }
}
