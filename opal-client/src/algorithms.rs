//! Algorithm service client

use opal_core::dto::algorithm::{AlgorithmDefinition, RetrieveAlgorithmResponse};
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{handle_response, normalize_base_url};

/// HTTP client for the algorithm-retrieval service
#[derive(Debug, Clone)]
pub struct AlgorithmClient {
    base_url: String,
    client: Client,
}

impl AlgorithmClient {
    /// Create a new algorithm client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the algorithm service (e.g., "http://localhost:3001")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new algorithm client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
        }
    }

    /// Get the base URL of the algorithm service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retrieve an algorithm definition by name
    ///
    /// # Arguments
    /// * `algorithm_name` - Name the algorithm was registered under
    pub async fn retrieve(&self, algorithm_name: &str) -> Result<AlgorithmDefinition> {
        let url = self.retrieve_url(algorithm_name)?;
        debug!(%url, "Retrieving algorithm");

        let response = self.client.get(url).send().await?;
        let envelope: RetrieveAlgorithmResponse = handle_response(response).await?;

        Ok(envelope.item.algorithm)
    }

    /// `<base>/retrieve/<name>/`, with `name` as a single encoded segment
    fn retrieve_url(&self, algorithm_name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["retrieve", algorithm_name, ""]);
        Ok(url)
    }
}
