//! Aggregation service client
//!
//! Every call is addressed as `<base>/<event>/<job-id>`. A session is bound
//! to one job and remembers whether `start` succeeded, so that terminating
//! calls issued without an active session are harmless no-ops.

use std::sync::atomic::{AtomicBool, Ordering};

use opal_core::dto::aggregation::{AggregationEvent, StartAggregation};
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::{handle_ok_response, normalize_base_url};

/// HTTP client for the aggregation/privacy service
#[derive(Debug, Clone)]
pub struct AggregationClient {
    base_url: String,
    client: Client,
}

impl AggregationClient {
    /// Create a new aggregation client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the aggregation service (e.g., "http://localhost:3002")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new aggregation client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
        }
    }

    /// Get the base URL of the aggregation service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Opens an (inactive) session bound to `job_id`
    pub fn session(&self, job_id: Uuid) -> AggregationSessionClient {
        AggregationSessionClient {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            job_id,
            active: AtomicBool::new(false),
        }
    }
}

/// Aggregation session of a single job
#[derive(Debug)]
pub struct AggregationSessionClient {
    base_url: String,
    client: Client,
    job_id: Uuid,
    active: AtomicBool,
}

impl AggregationSessionClient {
    /// Job this session is bound to
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Whether `start` succeeded and no terminating call has been made since
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Fully-qualified URL of `event` for this job
    pub fn event_url(&self, event: AggregationEvent) -> String {
        format!("{}/{}/{}", self.base_url, event.as_str(), self.job_id)
    }

    /// URL the algorithm posts partial results to
    ///
    /// Pure computation; the compute node never proxies update traffic.
    pub fn update_url(&self) -> String {
        self.event_url(AggregationEvent::Update)
    }

    /// Starts the aggregation session
    ///
    /// Marks the session active only on `200 OK`. Any other status, or a
    /// transport failure, leaves the session inactive.
    pub async fn start(
        &self,
        aggregation_method: &str,
        key_selector: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        let url = self.event_url(AggregationEvent::Start);
        debug!(job_id = %self.job_id, %url, "Starting aggregation session");

        let response = self
            .client
            .post(&url)
            .json(&StartAggregation {
                aggregation_method: aggregation_method.to_string(),
                key_selector: key_selector.cloned(),
            })
            .send()
            .await?;

        let body = handle_ok_response(response).await?;
        self.active.store(true, Ordering::SeqCst);

        info!(job_id = %self.job_id, aggregation_method, "Aggregation session started");
        Ok(body)
    }

    /// Signals that the job completed successfully
    pub async fn finish(&self) -> Result<()> {
        self.terminate(AggregationEvent::Finish).await
    }

    /// Signals that the job failed or was interrupted
    pub async fn cancel(&self) -> Result<()> {
        self.terminate(AggregationEvent::Cancel).await
    }

    async fn terminate(&self, event: AggregationEvent) -> Result<()> {
        // The flag is cleared before the call so a failed call is never retried
        if !self.active.swap(false, Ordering::SeqCst) {
            debug!(job_id = %self.job_id, %event, "No active aggregation session, skipping");
            return Ok(());
        }

        let url = self.event_url(event);
        debug!(job_id = %self.job_id, %url, "Terminating aggregation session");

        let response = self.client.post(&url).send().await?;
        handle_ok_response(response).await?;

        info!(job_id = %self.job_id, %event, "Aggregation session closed");
        Ok(())
    }
}
