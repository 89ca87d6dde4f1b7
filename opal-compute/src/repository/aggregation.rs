//! Aggregation repository
//!
//! Seam between the engine and the aggregation service, so runs can be
//! driven against a recording session in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use opal_client::{AggregationClient, AggregationSessionClient};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Factory of per-job aggregation sessions
pub trait AggregationService: Send + Sync {
    fn session(&self, job_id: Uuid) -> Box<dyn AggregationSession>;
}

/// Aggregation session of one job
///
/// `finish` and `cancel` are no-ops unless `start` succeeded.
#[async_trait]
pub trait AggregationSession: Send + Sync {
    async fn start(&self, aggregation_method: &str, key_selector: Option<&JsonValue>)
    -> Result<()>;

    /// URL the algorithm streams partial results to
    fn update_url(&self) -> String;

    async fn finish(&self) -> Result<()>;

    async fn cancel(&self) -> Result<()>;
}

impl AggregationService for AggregationClient {
    fn session(&self, job_id: Uuid) -> Box<dyn AggregationSession> {
        Box::new(AggregationClient::session(self, job_id))
    }
}

#[async_trait]
impl AggregationSession for AggregationSessionClient {
    async fn start(
        &self,
        aggregation_method: &str,
        key_selector: Option<&JsonValue>,
    ) -> Result<()> {
        AggregationSessionClient::start(self, aggregation_method, key_selector)
            .await
            .context("Aggregation start failed")?;
        Ok(())
    }

    fn update_url(&self) -> String {
        AggregationSessionClient::update_url(self)
    }

    async fn finish(&self) -> Result<()> {
        AggregationSessionClient::finish(self)
            .await
            .context("Aggregation finish failed")
    }

    async fn cancel(&self) -> Result<()> {
        AggregationSessionClient::cancel(self)
            .await
            .context("Aggregation cancel failed")
    }
}
