//! Protobuf messages for the log service.
//!
//! `OperationRecord` is the structured mutation record stored, encoded, as
//! each log entry's payload. The remaining messages are the request and
//! response bodies of the service facade.

use std::collections::HashMap;

/// Kind of mutation a record carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Operation {
    Add = 0,
    Update = 1,
    Upsert = 2,
    Delete = 3,
}

/// Encoding of the embedding vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ScalarEncoding {
    Float32 = 0,
    Int32 = 1,
}

/// One metadata value. An unset value deletes the key on update.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateMetadataValue {
    #[prost(oneof = "update_metadata_value::Value", tags = "1, 2, 3, 4")]
    pub value: Option<update_metadata_value::Value>,
}

pub mod update_metadata_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringValue(String),
        #[prost(int64, tag = "2")]
        IntValue(i64),
        #[prost(double, tag = "3")]
        FloatValue(f64),
        #[prost(bool, tag = "4")]
        BoolValue(bool),
    }
}

/// A mutation of one embedding record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OperationRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(float, repeated, tag = "2")]
    pub embedding: Vec<f32>,
    #[prost(enumeration = "ScalarEncoding", tag = "3")]
    pub encoding: i32,
    #[prost(map = "string, message", tag = "4")]
    pub metadata: HashMap<String, UpdateMetadataValue>,
    #[prost(string, optional, tag = "5")]
    pub document: Option<String>,
    #[prost(enumeration = "Operation", tag = "6")]
    pub operation: i32,
}

/// A decoded log entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogRecord {
    #[prost(int64, tag = "1")]
    pub log_offset: i64,
    #[prost(message, optional, tag = "2")]
    pub record: Option<OperationRecord>,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushLogsRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(message, repeated, tag = "2")]
    pub records: Vec<OperationRecord>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushLogsResponse {
    #[prost(uint64, tag = "1")]
    pub record_count: u64,
    #[prost(bool, tag = "2")]
    pub log_is_sealed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PullLogsRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(int64, tag = "2")]
    pub start_from_offset: i64,
    #[prost(int32, tag = "3")]
    pub batch_size: i32,
    /// Upper timestamp bound in unix nanoseconds. Zero or negative means
    /// unbounded.
    #[prost(int64, tag = "4")]
    pub end_timestamp: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PullLogsResponse {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<LogRecord>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScoutLogsRequest {
    #[prost(uint64, optional, tag = "1")]
    pub min_compaction_size: Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CollectionInfo {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(int64, tag = "2")]
    pub first_log_offset: i64,
    #[prost(int64, tag = "3")]
    pub first_log_ts: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScoutLogsResponse {
    #[prost(message, repeated, tag = "1")]
    pub collections: Vec<CollectionInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateCollectionLogOffsetRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(int64, tag = "2")]
    pub log_offset: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateCollectionLogOffsetResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackCollectionLogOffsetRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(int64, tag = "2")]
    pub log_offset: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackCollectionLogOffsetResponse {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SealLogRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SealLogResponse {
    #[prost(bool, tag = "1")]
    pub is_sealed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForkLogsRequest {
    #[prost(string, tag = "1")]
    pub source_collection_id: String,
    #[prost(string, tag = "2")]
    pub target_collection_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ForkLogsResponse {
    #[prost(uint64, tag = "1")]
    pub records_copied: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogState {
    #[prost(string, tag = "1")]
    pub collection_id: String,
    #[prost(int64, tag = "2")]
    pub enumeration_offset: i64,
    #[prost(int64, tag = "3")]
    pub compaction_offset: i64,
    #[prost(bool, tag = "4")]
    pub is_sealed: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScrubLogRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScrubLogResponse {
    #[prost(message, optional, tag = "1")]
    pub state: Option<LogState>,
    #[prost(int64, tag = "2")]
    pub record_count: i64,
    #[prost(int64, optional, tag = "3")]
    pub lowest_offset: Option<i64>,
    #[prost(int64, optional, tag = "4")]
    pub highest_offset: Option<i64>,
    #[prost(bool, tag = "5")]
    pub offsets_ordered: bool,
    #[prost(bool, tag = "6")]
    pub contiguous: bool,
    #[prost(bool, tag = "7")]
    pub uncompacted_present: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InspectLogStateRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InspectLogStateResponse {
    #[prost(message, optional, tag = "1")]
    pub state: Option<LogState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBoundsRequest {
    #[prost(string, tag = "1")]
    pub collection_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBoundsResponse {
    #[prost(int64, tag = "1")]
    pub start: i64,
    #[prost(int64, tag = "2")]
    pub limit: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTotalUncompactedRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetTotalUncompactedResponse {
    #[prost(uint64, tag = "1")]
    pub total_uncompacted: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PurgeCompactedRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PurgeCompactedResponse {
    #[prost(uint64, tag = "1")]
    pub records_purged: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GarbageCollectRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GarbageCollectResponse {
    #[prost(uint64, tag = "1")]
    pub records_purged: u64,
    #[prost(uint64, tag = "2")]
    pub collections_reaped: u64,
    #[prost(uint64, tag = "3")]
    pub collections_skipped: u64,
}
