//! In-memory log store.
//!
//! One `tokio::sync::Mutex` per collection serializes operations on that
//! collection. The outer map lock is only held long enough to look up,
//! insert, or remove a collection handle; it is never held while waiting on
//! a collection mutex.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{LogStore, Result, StorageError};
use crate::types::{
    now_nanos, CollectionId, CollectionInfo, CollectionLogState, PushOutcome, RecordEntry,
    ScrubReport,
};

/// One collection's log.
struct CollectionLog {
    state: CollectionLogState,
    records: BTreeMap<i64, RecordEntry>,
    /// Set when the log is removed from the map. Holders of a stale handle
    /// must look the collection up again.
    reaped: bool,
}

impl CollectionLog {
    fn new(collection_id: CollectionId) -> Self {
        Self {
            state: CollectionLogState::empty(collection_id),
            records: BTreeMap::new(),
            reaped: false,
        }
    }
}

type LogHandle = Arc<Mutex<CollectionLog>>;

/// In-memory `LogStore` for tests and embedded use.
#[derive(Default)]
pub struct MemoryLogStore {
    logs: RwLock<HashMap<CollectionId, LogHandle>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self, collection_id: CollectionId) -> Option<LogHandle> {
        self.logs.read().await.get(&collection_id).cloned()
    }

    async fn handle_or_create(&self, collection_id: CollectionId) -> LogHandle {
        if let Some(handle) = self.handle(collection_id).await {
            return handle;
        }
        self.logs
            .write()
            .await
            .entry(collection_id)
            .or_insert_with(|| Arc::new(Mutex::new(CollectionLog::new(collection_id))))
            .clone()
    }

    async fn handles(&self) -> Vec<LogHandle> {
        self.logs.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn push(&self, collection_id: CollectionId, records: Vec<Vec<u8>>) -> Result<PushOutcome> {
        if records.is_empty() {
            let sealed = self
                .get_state(collection_id)
                .await?
                .map(|state| state.is_sealed)
                .unwrap_or(false);
            return Ok(PushOutcome {
                records_written: 0,
                sealed,
            });
        }

        loop {
            let handle = self.handle_or_create(collection_id).await;
            let mut log = handle.lock().await;
            if log.reaped {
                continue;
            }
            if log.state.is_sealed {
                return Ok(PushOutcome::sealed());
            }

            let timestamp = now_nanos();
            let count = records.len();
            for record in records {
                let log_offset = log.state.enumeration_offset + 1;
                log.records.insert(
                    log_offset,
                    RecordEntry {
                        log_offset,
                        record,
                        timestamp,
                    },
                );
                log.state.enumeration_offset = log_offset;
            }
            return Ok(PushOutcome::written(count));
        }
    }

    async fn pull(
        &self,
        collection_id: CollectionId,
        start_offset: i64,
        batch_size: usize,
        end_timestamp: i64,
    ) -> Result<Vec<RecordEntry>> {
        let Some(handle) = self.handle(collection_id).await else {
            return Ok(Vec::new());
        };
        let log = handle.lock().await;
        Ok(log
            .records
            .range(start_offset..)
            .map(|(_, entry)| entry)
            .filter(|entry| entry.timestamp <= end_timestamp)
            .take(batch_size)
            .cloned()
            .collect())
    }

    async fn scout(&self, min_compaction_size: u64) -> Result<Vec<CollectionInfo>> {
        let threshold = i64::try_from(min_compaction_size)
            .unwrap_or(i64::MAX)
            .max(1);

        let mut candidates = Vec::new();
        for handle in self.handles().await {
            let log = handle.lock().await;
            if log.reaped || log.state.is_sealed || log.state.uncompacted() < threshold {
                continue;
            }
            if let Some(first) = log.records.get(&(log.state.compaction_offset + 1)) {
                candidates.push(CollectionInfo {
                    collection_id: log.state.collection_id,
                    first_log_offset: first.log_offset,
                    first_log_ts: first.timestamp,
                });
            }
        }

        candidates.sort_by_key(|info| (info.first_log_ts, info.collection_id));
        Ok(candidates)
    }

    async fn advance_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: i64,
    ) -> Result<()> {
        let handle = self
            .handle(collection_id)
            .await
            .ok_or(StorageError::UnknownCollection(collection_id))?;
        let mut log = handle.lock().await;
        if log.reaped {
            return Err(StorageError::UnknownCollection(collection_id));
        }

        let state = log.state;
        if new_offset < state.compaction_offset || new_offset > state.enumeration_offset {
            return Err(StorageError::InvalidCompactionOffset {
                collection_id,
                requested: new_offset,
                current: state.compaction_offset,
                enumeration: state.enumeration_offset,
            });
        }
        log.state.compaction_offset = new_offset;
        Ok(())
    }

    async fn rollback_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: i64,
    ) -> Result<()> {
        let handle = self
            .handle(collection_id)
            .await
            .ok_or(StorageError::UnknownCollection(collection_id))?;
        let mut log = handle.lock().await;
        if log.reaped {
            return Err(StorageError::UnknownCollection(collection_id));
        }

        let state = log.state;
        if new_offset < 0 || new_offset > state.compaction_offset {
            return Err(StorageError::InvalidCompactionOffset {
                collection_id,
                requested: new_offset,
                current: state.compaction_offset,
                enumeration: state.enumeration_offset,
            });
        }

        let present = log
            .records
            .range(new_offset + 1..state.compaction_offset + 1)
            .count() as i64;
        if present != state.compaction_offset - new_offset {
            return Err(StorageError::RollbackPastPurge {
                collection_id,
                requested: new_offset,
            });
        }

        log.state.compaction_offset = new_offset;
        Ok(())
    }

    async fn seal(&self, collection_id: CollectionId) -> Result<CollectionLogState> {
        loop {
            let handle = self.handle_or_create(collection_id).await;
            let mut log = handle.lock().await;
            if log.reaped {
                continue;
            }
            log.state.is_sealed = true;
            return Ok(log.state);
        }
    }

    async fn fork(&self, source: CollectionId, target: CollectionId) -> Result<u64> {
        let handle = self
            .handle(source)
            .await
            .ok_or(StorageError::CollectionNotFound(source))?;
        let source_log = handle.lock().await;
        if source_log.reaped {
            return Err(StorageError::CollectionNotFound(source));
        }

        let mut forked = CollectionLog::new(target);
        forked.state.enumeration_offset = source_log.state.enumeration_offset;
        forked.state.compaction_offset = source_log.state.compaction_offset;
        forked.records = source_log.records.clone();
        let copied = forked.records.len() as u64;

        let mut logs = self.logs.write().await;
        if logs.contains_key(&target) {
            return Err(StorageError::CollectionExists(target));
        }
        logs.insert(target, Arc::new(Mutex::new(forked)));
        Ok(copied)
    }

    async fn purge_compacted(&self) -> Result<u64> {
        let mut purged = 0;
        for handle in self.handles().await {
            let mut log = handle.lock().await;
            let boundary = log.state.compaction_offset + 1;
            let retained = log.records.split_off(&boundary);
            purged += log.records.len() as u64;
            log.records = retained;
        }
        Ok(purged)
    }

    async fn list_collection_ids(&self) -> Result<Vec<CollectionId>> {
        Ok(self.logs.read().await.keys().copied().collect())
    }

    async fn delete_collections(&self, collection_ids: &[CollectionId]) -> Result<u64> {
        let removed: Vec<LogHandle> = {
            let mut logs = self.logs.write().await;
            collection_ids
                .iter()
                .filter_map(|id| logs.remove(id))
                .collect()
        };

        for handle in &removed {
            handle.lock().await.reaped = true;
        }
        Ok(removed.len() as u64)
    }

    async fn get_state(&self, collection_id: CollectionId) -> Result<Option<CollectionLogState>> {
        let Some(handle) = self.handle(collection_id).await else {
            return Ok(None);
        };
        let log = handle.lock().await;
        Ok((!log.reaped).then_some(log.state))
    }

    async fn scrub(&self, collection_id: CollectionId) -> Result<ScrubReport> {
        let handle = self
            .handle(collection_id)
            .await
            .ok_or(StorageError::CollectionNotFound(collection_id))?;
        let log = handle.lock().await;
        if log.reaped {
            return Err(StorageError::CollectionNotFound(collection_id));
        }

        Ok(ScrubReport::evaluate(
            log.state,
            log.records.len() as i64,
            log.records.keys().next().copied(),
            log.records.keys().next_back().copied(),
        ))
    }

    async fn total_uncompacted(&self) -> Result<u64> {
        let mut total = 0;
        for handle in self.handles().await {
            let log = handle.lock().await;
            total += log.state.uncompacted().max(0) as u64;
        }
        Ok(total)
    }
}
