//! Algorithm repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use opal_client::AlgorithmClient;
use opal_core::dto::algorithm::AlgorithmDefinition;

/// Source of algorithm definitions
#[async_trait]
pub trait AlgorithmRepository: Send + Sync {
    async fn retrieve(&self, algorithm_name: &str) -> Result<AlgorithmDefinition>;
}

#[async_trait]
impl AlgorithmRepository for AlgorithmClient {
    async fn retrieve(&self, algorithm_name: &str) -> Result<AlgorithmDefinition> {
        AlgorithmClient::retrieve(self, algorithm_name)
            .await
            .with_context(|| format!("Failed to retrieve algorithm '{}'", algorithm_name))
    }
}
