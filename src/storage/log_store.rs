//! LogStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::types::{
    CollectionId, CollectionInfo, CollectionLogState, LogBounds, PushOutcome, RecordEntry,
    ScrubReport,
};

/// Interface for the per-collection record log.
///
/// Every mutating operation is one transaction in the backing store. No
/// counters are cached in-process: all coordination between concurrent
/// callers happens through the store, so any number of service instances
/// may share one database.
///
/// The `(collection_id, log_offset)` pair forms the unique key for stored
/// records.
///
/// Implementations:
/// - `SqliteLogStore`: SQLite storage
/// - `PostgresLogStore`: PostgreSQL storage
/// - `MemoryLogStore`: In-memory storage for tests and embedded use
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append records to a collection's log.
    ///
    /// Creates the collection's state row on first use. Offsets continue from
    /// the current enumeration offset with no gaps. A sealed log writes
    /// nothing and reports `sealed`.
    async fn push(&self, collection_id: CollectionId, records: Vec<Vec<u8>>)
        -> Result<PushOutcome>;

    /// Read records with `log_offset >= start_offset` and
    /// `timestamp <= end_timestamp`, ascending, at most `batch_size` rows.
    ///
    /// An unknown collection yields an empty result.
    async fn pull(
        &self,
        collection_id: CollectionId,
        start_offset: i64,
        batch_size: usize,
        end_timestamp: i64,
    ) -> Result<Vec<RecordEntry>>;

    /// List unsealed collections with at least `max(min_compaction_size, 1)`
    /// uncompacted records, oldest first.
    async fn scout(&self, min_compaction_size: u64) -> Result<Vec<CollectionInfo>>;

    /// Move the compaction offset forward (or leave it unchanged).
    ///
    /// Fails if the collection has no log, if `new_offset` is behind the
    /// current compaction offset, or if it is beyond the enumeration offset.
    async fn advance_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: i64,
    ) -> Result<()>;

    /// Move the compaction offset backward after a failed compaction.
    ///
    /// Every offset in `(new_offset, current]` must still be present.
    async fn rollback_compaction_offset(
        &self,
        collection_id: CollectionId,
        new_offset: i64,
    ) -> Result<()>;

    /// Seal a collection's log, creating an empty one if needed. Idempotent.
    async fn seal(&self, collection_id: CollectionId) -> Result<CollectionLogState>;

    /// Copy every present record of `source` into a new log `target`,
    /// preserving offsets and timestamps. Returns the number of records copied.
    async fn fork(&self, source: CollectionId, target: CollectionId) -> Result<u64>;

    /// Delete every record at or below its collection's compaction offset.
    ///
    /// Returns the number of records deleted.
    async fn purge_compacted(&self) -> Result<u64>;

    /// Every collection id with a state row or at least one record.
    async fn list_collection_ids(&self) -> Result<Vec<CollectionId>>;

    /// Delete records and state rows for the given collections in one
    /// transaction. Returns the number of state rows removed.
    async fn delete_collections(&self, collection_ids: &[CollectionId]) -> Result<u64>;

    /// Read a collection's state row.
    async fn get_state(&self, collection_id: CollectionId) -> Result<Option<CollectionLogState>>;

    /// Check the log invariants for one collection.
    async fn scrub(&self, collection_id: CollectionId) -> Result<ScrubReport>;

    /// Sum of uncompacted records across all collections.
    async fn total_uncompacted(&self) -> Result<u64>;

    /// Half-open range of offsets a reader may pull.
    async fn bounds(&self, collection_id: CollectionId) -> Result<LogBounds> {
        let Some(state) = self.get_state(collection_id).await? else {
            return Ok(LogBounds::empty());
        };
        let first = self.pull(collection_id, 0, 1, i64::MAX).await?;
        let start = first
            .first()
            .map(|entry| entry.log_offset)
            .unwrap_or(state.compaction_offset + 1);
        Ok(LogBounds {
            start,
            limit: state.enumeration_offset + 1,
        })
    }
}
