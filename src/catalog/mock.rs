//! In-memory catalog for testing.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CatalogError, CollectionCatalog};
use crate::types::CollectionId;

/// Catalog backed by a set of live collection ids.
///
/// Ids marked failing make any check that includes them return
/// `CatalogError::Unavailable`.
#[derive(Default)]
pub struct MockCatalog {
    live: RwLock<HashSet<CollectionId>>,
    failing: RwLock<HashSet<CollectionId>>,
    calls: RwLock<Vec<usize>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, collection_id: CollectionId) {
        self.live.write().await.insert(collection_id);
    }

    pub async fn remove(&self, collection_id: CollectionId) {
        self.live.write().await.remove(&collection_id);
    }

    pub async fn set_failing(&self, collection_id: CollectionId, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(collection_id);
        } else {
            set.remove(&collection_id);
        }
    }

    /// Batch sizes of every check made so far.
    pub async fn calls(&self) -> Vec<usize> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl CollectionCatalog for MockCatalog {
    async fn check_existence(
        &self,
        collection_ids: &[CollectionId],
    ) -> Result<Vec<bool>, CatalogError> {
        self.calls.write().await.push(collection_ids.len());

        let failing = self.failing.read().await;
        if let Some(id) = collection_ids.iter().find(|id| failing.contains(id)) {
            return Err(CatalogError::Unavailable(format!("check failed for {}", id)));
        }

        let live = self.live.read().await;
        Ok(collection_ids.iter().map(|id| live.contains(id)).collect())
    }
}
