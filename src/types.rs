//! Core log types.
//!
//! Offsets are 1-based and gap-free within a collection. Offset 0 means
//! "nothing assigned yet" for `enumeration_offset` and "nothing compacted"
//! for `compaction_offset`.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Opaque collection identifier.
///
/// Identity is the id, never a collection name: a collection deleted and
/// recreated under the same name gets a new id and therefore a fresh log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(Uuid);

impl CollectionId {
    /// Generate a new random collection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a collection id from its string form.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CollectionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for CollectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-collection log bookkeeping (one row per collection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionLogState {
    pub collection_id: CollectionId,
    /// Highest offset ever assigned.
    pub enumeration_offset: i64,
    /// Highest offset folded into the index. Purge boundary.
    pub compaction_offset: i64,
    /// Sealed logs accept no further pushes.
    pub is_sealed: bool,
}

impl CollectionLogState {
    /// State of a collection that has never been written.
    pub fn empty(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            enumeration_offset: 0,
            compaction_offset: 0,
            is_sealed: false,
        }
    }

    /// Number of records not yet folded into the index.
    pub fn uncompacted(&self) -> i64 {
        self.enumeration_offset - self.compaction_offset
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub log_offset: i64,
    /// Opaque payload, round-tripped byte-for-byte.
    pub record: Vec<u8>,
    /// Insertion time in unix nanoseconds. Bounds pulls, never orders them.
    pub timestamp: i64,
}

/// Result of a push.
///
/// A sealed log is an expected outcome, not an error: callers redirect
/// writes elsewhere when `sealed` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    pub records_written: usize,
    pub sealed: bool,
}

impl PushOutcome {
    pub fn written(records_written: usize) -> Self {
        Self {
            records_written,
            sealed: false,
        }
    }

    pub fn sealed() -> Self {
        Self {
            records_written: 0,
            sealed: true,
        }
    }
}

/// A collection the compactor should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    pub collection_id: CollectionId,
    /// Offset of the oldest record not yet compacted.
    pub first_log_offset: i64,
    /// Insertion time of that record.
    pub first_log_ts: i64,
}

/// Half-open offset range `[start, limit)` a reader may pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogBounds {
    pub start: i64,
    pub limit: i64,
}

impl LogBounds {
    /// Bounds of a collection with no log.
    pub fn empty() -> Self {
        Self { start: 1, limit: 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.limit
    }
}

/// Consistency report for one collection's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubReport {
    pub state: CollectionLogState,
    pub record_count: i64,
    pub lowest_offset: Option<i64>,
    pub highest_offset: Option<i64>,
    /// `compaction_offset <= enumeration_offset`.
    pub offsets_ordered: bool,
    /// Present offsets form one run with no holes.
    pub contiguous: bool,
    /// Every offset above the compaction offset is present and nothing
    /// beyond the enumeration offset exists.
    pub uncompacted_present: bool,
}

impl ScrubReport {
    /// Evaluate the log invariants from the state row and record statistics.
    pub fn evaluate(
        state: CollectionLogState,
        record_count: i64,
        lowest_offset: Option<i64>,
        highest_offset: Option<i64>,
    ) -> Self {
        let offsets_ordered = state.compaction_offset <= state.enumeration_offset
            && state.compaction_offset >= 0;

        let (contiguous, uncompacted_present) = match (lowest_offset, highest_offset) {
            (Some(lowest), Some(highest)) => {
                let contiguous = highest - lowest + 1 == record_count && lowest >= 1;
                let covered = highest == state.enumeration_offset
                    && lowest <= state.compaction_offset + 1;
                (contiguous, covered)
            }
            _ => (record_count == 0, state.uncompacted() == 0),
        };

        Self {
            state,
            record_count,
            lowest_offset,
            highest_offset,
            offsets_ordered,
            contiguous,
            uncompacted_present,
        }
    }

    /// All invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.offsets_ordered && self.contiguous && self.uncompacted_present
    }
}

/// Current wall-clock time in unix nanoseconds.
pub fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}
