//! HTTP catalog client.
//!
//! POSTs `{"collection_ids": [...]}` and expects `{"exists": [...]}` with one
//! flag per requested id.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CatalogConfig, CatalogError, CollectionCatalog};
use crate::types::CollectionId;

#[derive(Debug, Serialize)]
struct ExistenceRequest {
    collection_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExistenceResponse {
    exists: Vec<bool>,
}

/// Catalog reached over HTTP, with retry on transient failures.
pub struct HttpCatalog {
    client: Client,
    endpoint: String,
}

impl HttpCatalog {
    /// Create a catalog client from configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        if config.endpoint.is_empty() {
            return Err(CatalogError::Config(
                "catalog endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    fn backoff() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(5)
            .with_jitter()
    }

    fn is_retryable(err: &CatalogError) -> bool {
        match err {
            CatalogError::Http(err) => err.is_timeout() || err.is_connect(),
            CatalogError::Unavailable(_) => true,
            CatalogError::Malformed(_) | CatalogError::Config(_) => false,
        }
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    async fn post_check(&self, request: &ExistenceRequest) -> Result<Vec<bool>, CatalogError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = format!(
                "HTTP {} - {}",
                status,
                body.chars().take(200).collect::<String>()
            );
            return if Self::is_retryable_status(status) {
                warn!(endpoint = %self.endpoint, status = %status, "Catalog returned retryable status");
                Err(CatalogError::Unavailable(detail))
            } else {
                Err(CatalogError::Malformed(detail))
            };
        }

        let body: ExistenceResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;

        if body.exists.len() != request.collection_ids.len() {
            return Err(CatalogError::Malformed(format!(
                "asked about {} collections, got {} answers",
                request.collection_ids.len(),
                body.exists.len()
            )));
        }
        Ok(body.exists)
    }
}

#[async_trait]
impl CollectionCatalog for HttpCatalog {
    async fn check_existence(
        &self,
        collection_ids: &[CollectionId],
    ) -> Result<Vec<bool>, CatalogError> {
        if collection_ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = ExistenceRequest {
            collection_ids: collection_ids.iter().map(|id| id.to_string()).collect(),
        };

        let exists = (|| async { self.post_check(&request).await })
            .retry(Self::backoff())
            .when(Self::is_retryable)
            .await?;

        debug!(
            endpoint = %self.endpoint,
            checked = exists.len(),
            missing = exists.iter().filter(|e| !**e).count(),
            "Checked collection existence"
        );
        Ok(exists)
    }
}
