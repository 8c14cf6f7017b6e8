//! Input validation for external data.
//!
//! Everything a request carries is checked here before it reaches storage,
//! so a rejected request never touches a transaction.

#![allow(clippy::result_large_err)]

use tonic::Status;

use crate::config::LimitsConfig;
use crate::types::CollectionId;

/// Error constants for validation failures.
pub mod errmsg {
    pub const COLLECTION_ID_EMPTY: &str = "collection_id cannot be empty";
    pub const COLLECTION_ID_INVALID: &str = "collection_id is not a valid UUID";

    pub const TOO_MANY_RECORDS: &str = "push exceeds maximum records";
    pub const RECORD_TOO_LARGE: &str = "record exceeds maximum encoded size";

    pub const BATCH_SIZE_NEGATIVE: &str = "batch_size cannot be negative";
    pub const OFFSET_NEGATIVE: &str = "log offset cannot be negative";
    pub const FORK_SAME_COLLECTION: &str = "fork source and target must differ";
}

/// Parse and validate a collection id from its wire form.
pub fn validate_collection_id(value: &str) -> Result<CollectionId, Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(errmsg::COLLECTION_ID_EMPTY));
    }
    CollectionId::parse(value).map_err(|_| {
        Status::invalid_argument(format!(
            "{}: {:?}",
            errmsg::COLLECTION_ID_INVALID,
            value.chars().take(64).collect::<String>()
        ))
    })
}

/// Validate the shape of a push: record count and per-record encoded size.
pub fn validate_push(encoded: &[Vec<u8>], limits: &LimitsConfig) -> Result<(), Status> {
    if encoded.len() > limits.max_records_per_push {
        return Err(Status::invalid_argument(format!(
            "{} (max: {}, got: {})",
            errmsg::TOO_MANY_RECORDS,
            limits.max_records_per_push,
            encoded.len()
        )));
    }

    for (index, record) in encoded.iter().enumerate() {
        if record.len() > limits.max_record_bytes {
            return Err(Status::invalid_argument(format!(
                "{} (record: {}, max: {}, got: {})",
                errmsg::RECORD_TOO_LARGE,
                index,
                limits.max_record_bytes,
                record.len()
            )));
        }
    }

    Ok(())
}

/// Validate a pull batch size, clamping it to the configured maximum.
pub fn validate_batch_size(batch_size: i32, limits: &LimitsConfig) -> Result<usize, Status> {
    if batch_size < 0 {
        return Err(Status::invalid_argument(errmsg::BATCH_SIZE_NEGATIVE));
    }
    Ok((batch_size as usize).min(limits.max_pull_batch))
}

/// Validate a client-supplied log offset.
pub fn validate_offset(offset: i64) -> Result<i64, Status> {
    if offset < 0 {
        return Err(Status::invalid_argument(format!(
            "{} (got: {})",
            errmsg::OFFSET_NEGATIVE,
            offset
        )));
    }
    Ok(offset)
}

/// Validate a fork request's pair of collection ids.
pub fn validate_fork(
    source: &str,
    target: &str,
) -> Result<(CollectionId, CollectionId), Status> {
    let source = validate_collection_id(source)?;
    let target = validate_collection_id(target)?;
    if source == target {
        return Err(Status::invalid_argument(errmsg::FORK_SAME_COLLECTION));
    }
    Ok((source, target))
}
