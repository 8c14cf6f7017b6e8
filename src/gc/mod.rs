//! Garbage collection for record logs.
//!
//! Two passes, both safe to repeat:
//! - purge: drop records already folded into the index
//! - reap: drop the whole log of every collection the catalog no longer knows
//!
//! Catalog checks happen outside any storage transaction. A failed check
//! skips its ids for the pass; they are retried on the next one.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::CollectionCatalog;
use crate::storage::{LogStore, Result};
use crate::types::CollectionId;

/// Garbage collector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Run the background collector.
    pub enabled: bool,
    /// Seconds between passes.
    pub interval_secs: u64,
    /// Collection ids per catalog request.
    pub catalog_batch_size: usize,
    /// Purge compacted records on each pass.
    pub purge: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            catalog_batch_size: 100,
            purge: true,
        }
    }
}

/// Outcome of one reap pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Collection ids the catalog answered for.
    pub checked: usize,
    /// Logs deleted.
    pub reaped: u64,
    /// Ids left alone because their catalog check failed.
    pub skipped: usize,
}

/// Outcome of one full collector pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    pub purged: u64,
    pub reap: ReapReport,
}

/// Reconciles the log store against the collection catalog.
pub struct GarbageCollector {
    store: Arc<dyn LogStore>,
    catalog: Arc<dyn CollectionCatalog>,
    config: GcConfig,
}

impl GarbageCollector {
    pub fn new(
        store: Arc<dyn LogStore>,
        catalog: Arc<dyn CollectionCatalog>,
        config: GcConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    /// Delete every record at or below its collection's compaction offset.
    pub async fn purge_compacted(&self) -> Result<u64> {
        let purged = self.store.purge_compacted().await?;
        if purged > 0 {
            info!(purged, "Purged compacted records");
        }
        Ok(purged)
    }

    /// Delete the logs of collections the catalog no longer knows.
    pub async fn reap_deleted_collections(&self) -> Result<ReapReport> {
        let collection_ids = self.store.list_collection_ids().await?;
        let mut report = ReapReport::default();
        let mut doomed: Vec<CollectionId> = Vec::new();

        for chunk in collection_ids.chunks(self.config.catalog_batch_size.max(1)) {
            match self.catalog.check_existence(chunk).await {
                Ok(exists) if exists.len() == chunk.len() => {
                    report.checked += chunk.len();
                    doomed.extend(
                        chunk
                            .iter()
                            .zip(exists)
                            .filter(|(_, exists)| !exists)
                            .map(|(id, _)| *id),
                    );
                }
                Ok(exists) => {
                    warn!(
                        requested = chunk.len(),
                        answered = exists.len(),
                        "Catalog answered a different number of ids, skipping batch"
                    );
                    report.skipped += chunk.len();
                }
                Err(e) => {
                    warn!(error = %e, count = chunk.len(), "Catalog check failed, skipping batch");
                    report.skipped += chunk.len();
                }
            }
        }

        if !doomed.is_empty() {
            report.reaped = self.store.delete_collections(&doomed).await?;
            for id in &doomed {
                debug!(collection_id = %id, "Reaped log of deleted collection");
            }
        }

        info!(
            checked = report.checked,
            reaped = report.reaped,
            skipped = report.skipped,
            "Reap pass complete"
        );
        Ok(report)
    }

    /// Run one full pass: purge (if enabled), then reap.
    pub async fn run_once(&self) -> Result<GcReport> {
        let purged = if self.config.purge {
            self.purge_compacted().await?
        } else {
            0
        };
        let reap = self.reap_deleted_collections().await?;
        Ok(GcReport { purged, reap })
    }

    /// Spawn the collector as a background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if let Err(e) = self.run_once().await {
                    warn!(error = %e, "Garbage collection pass failed");
                }
            }
        })
    }
}
