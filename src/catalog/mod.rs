//! External collection catalog.
//!
//! The catalog is the source of truth for which collections exist. The log
//! only asks it about existence, in batches, and never while holding a
//! storage transaction.

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::CollectionId;

mod http;
#[cfg(any(test, feature = "test-utils"))]
mod mock;

pub use http::HttpCatalog;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockCatalog;

/// Errors from the catalog client.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed catalog response: {0}")]
    Malformed(String),

    #[error("Catalog configuration error: {0}")]
    Config(String),
}

/// Interface to the collection catalog.
#[async_trait]
pub trait CollectionCatalog: Send + Sync {
    /// Report, for each id, whether the catalog still knows the collection.
    ///
    /// The result has one entry per input id, in input order. An empty input
    /// yields an empty result without contacting the catalog.
    async fn check_existence(
        &self,
        collection_ids: &[CollectionId],
    ) -> Result<Vec<bool>, CatalogError>;
}

/// Catalog client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Existence-check endpoint URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/v1/collections/exists".to_string(),
            timeout_secs: 10,
        }
    }
}
