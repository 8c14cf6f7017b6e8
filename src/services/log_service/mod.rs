//! Log service facade.
//!
//! Validates requests, encodes structured records to payload bytes before a
//! push and decodes them after a pull, and maps storage errors to gRPC status
//! codes. Storage detail never crosses this boundary for fatal errors; it is
//! logged here instead.

#![allow(clippy::result_large_err)]

use std::sync::Arc;

use prost::Message;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info};

use super::errmsg;
use crate::catalog::CollectionCatalog;
use crate::config::{Config, LimitsConfig, ScoutConfig};
use crate::gc::GarbageCollector;
use crate::proto::{
    CollectionInfo, ForkLogsRequest, ForkLogsResponse, GarbageCollectRequest,
    GarbageCollectResponse, GetBoundsRequest, GetBoundsResponse, GetTotalUncompactedRequest,
    GetTotalUncompactedResponse, InspectLogStateRequest, InspectLogStateResponse, LogRecord,
    LogState, OperationRecord, PullLogsRequest, PullLogsResponse, PurgeCompactedRequest,
    PurgeCompactedResponse, PushLogsRequest, PushLogsResponse, RollbackCollectionLogOffsetRequest,
    RollbackCollectionLogOffsetResponse, ScoutLogsRequest, ScoutLogsResponse, ScrubLogRequest,
    ScrubLogResponse, SealLogRequest, SealLogResponse, UpdateCollectionLogOffsetRequest,
    UpdateCollectionLogOffsetResponse,
};
use crate::storage::{ErrorKind, LogStore, StorageError};
use crate::types::CollectionLogState;
use crate::validation::{
    validate_batch_size, validate_collection_id, validate_fork, validate_offset, validate_push,
};

/// Map a storage error to a gRPC status.
///
/// Fatal errors are logged with full detail and returned as a generic
/// internal error.
pub fn storage_status(operation: &'static str, err: StorageError) -> Status {
    match err.kind() {
        ErrorKind::Validation => Status::invalid_argument(err.to_string()),
        ErrorKind::Conflict => Status::aborted(err.to_string()),
        ErrorKind::NotFound => Status::not_found(err.to_string()),
        ErrorKind::AlreadyExists => Status::already_exists(err.to_string()),
        ErrorKind::Fatal => {
            error!(operation, error = %err, "Storage operation failed");
            Status::internal(errmsg::INTERNAL_ERROR)
        }
    }
}

fn log_state(state: CollectionLogState) -> LogState {
    LogState {
        collection_id: state.collection_id.to_string(),
        enumeration_offset: state.enumeration_offset,
        compaction_offset: state.compaction_offset,
        is_sealed: state.is_sealed,
    }
}

/// Log service.
///
/// One instance per process; holds only shared handles, so any number of
/// instances may serve the same store.
pub struct LogService {
    store: Arc<dyn LogStore>,
    gc: GarbageCollector,
    limits: LimitsConfig,
    scout: ScoutConfig,
}

impl LogService {
    /// Create a log service over a store and catalog.
    pub fn new(
        store: Arc<dyn LogStore>,
        catalog: Arc<dyn CollectionCatalog>,
        config: &Config,
    ) -> Self {
        Self {
            gc: GarbageCollector::new(store.clone(), catalog, config.gc.clone()),
            store,
            limits: config.limits.clone(),
            scout: config.scout.clone(),
        }
    }

    pub async fn push_logs(
        &self,
        request: Request<PushLogsRequest>,
    ) -> Result<Response<PushLogsResponse>, Status> {
        let request = request.into_inner();
        let collection_id = validate_collection_id(&request.collection_id)?;

        let encoded: Vec<Vec<u8>> = request
            .records
            .iter()
            .map(|record| record.encode_to_vec())
            .collect();
        validate_push(&encoded, &self.limits)?;

        let outcome = self
            .store
            .push(collection_id, encoded)
            .await
            .map_err(|e| storage_status("push_logs", e))?;

        debug!(
            collection_id = %collection_id,
            count = outcome.records_written,
            sealed = outcome.sealed,
            "PushLogs"
        );
        Ok(Response::new(PushLogsResponse {
            record_count: outcome.records_written as u64,
            log_is_sealed: outcome.sealed,
        }))
    }

    pub async fn pull_logs(
        &self,
        request: Request<PullLogsRequest>,
    ) -> Result<Response<PullLogsResponse>, Status> {
        let request = request.into_inner();
        let collection_id = validate_collection_id(&request.collection_id)?;
        let batch_size = validate_batch_size(request.batch_size, &self.limits)?;
        let end_timestamp = if request.end_timestamp > 0 {
            request.end_timestamp
        } else {
            i64::MAX
        };

        let entries = self
            .store
            .pull(
                collection_id,
                request.start_from_offset,
                batch_size,
                end_timestamp,
            )
            .await
            .map_err(|e| storage_status("pull_logs", e))?;

        let records = entries
            .into_iter()
            .map(|entry| -> Result<LogRecord, Status> {
                let record = OperationRecord::decode(entry.record.as_slice()).map_err(|e| {
                    error!(
                        collection_id = %collection_id,
                        log_offset = entry.log_offset,
                        error = %e,
                        "Failed to decode stored record"
                    );
                    Status::internal(errmsg::CORRUPT_RECORD)
                })?;
                Ok(LogRecord {
                    log_offset: entry.log_offset,
                    record: Some(record),
                    timestamp: entry.timestamp,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Response::new(PullLogsResponse { records }))
    }

    pub async fn scout_logs(
        &self,
        request: Request<ScoutLogsRequest>,
    ) -> Result<Response<ScoutLogsResponse>, Status> {
        let min_compaction_size = request
            .into_inner()
            .min_compaction_size
            .unwrap_or(self.scout.default_min_compaction_size);

        let collections = self
            .store
            .scout(min_compaction_size)
            .await
            .map_err(|e| storage_status("scout_logs", e))?
            .into_iter()
            .map(|info| CollectionInfo {
                collection_id: info.collection_id.to_string(),
                first_log_offset: info.first_log_offset,
                first_log_ts: info.first_log_ts,
            })
            .collect();

        Ok(Response::new(ScoutLogsResponse { collections }))
    }

    pub async fn update_collection_log_offset(
        &self,
        request: Request<UpdateCollectionLogOffsetRequest>,
    ) -> Result<Response<UpdateCollectionLogOffsetResponse>, Status> {
        let request = request.into_inner();
        let collection_id = validate_collection_id(&request.collection_id)?;
        let log_offset = validate_offset(request.log_offset)?;

        self.store
            .advance_compaction_offset(collection_id, log_offset)
            .await
            .map_err(|e| storage_status("update_collection_log_offset", e))?;

        debug!(collection_id = %collection_id, log_offset, "Advanced compaction offset");
        Ok(Response::new(UpdateCollectionLogOffsetResponse {}))
    }

    pub async fn rollback_collection_log_offset(
        &self,
        request: Request<RollbackCollectionLogOffsetRequest>,
    ) -> Result<Response<RollbackCollectionLogOffsetResponse>, Status> {
        let request = request.into_inner();
        let collection_id = validate_collection_id(&request.collection_id)?;
        let log_offset = validate_offset(request.log_offset)?;

        self.store
            .rollback_compaction_offset(collection_id, log_offset)
            .await
            .map_err(|e| storage_status("rollback_collection_log_offset", e))?;

        info!(collection_id = %collection_id, log_offset, "Rolled back compaction offset");
        Ok(Response::new(RollbackCollectionLogOffsetResponse {}))
    }

    pub async fn seal_log(
        &self,
        request: Request<SealLogRequest>,
    ) -> Result<Response<SealLogResponse>, Status> {
        let collection_id = validate_collection_id(&request.into_inner().collection_id)?;

        let state = self
            .store
            .seal(collection_id)
            .await
            .map_err(|e| storage_status("seal_log", e))?;

        Ok(Response::new(SealLogResponse {
            is_sealed: state.is_sealed,
        }))
    }

    pub async fn fork_logs(
        &self,
        request: Request<ForkLogsRequest>,
    ) -> Result<Response<ForkLogsResponse>, Status> {
        let request = request.into_inner();
        let (source, target) =
            validate_fork(&request.source_collection_id, &request.target_collection_id)?;

        let records_copied = self
            .store
            .fork(source, target)
            .await
            .map_err(|e| storage_status("fork_logs", e))?;

        Ok(Response::new(ForkLogsResponse { records_copied }))
    }

    pub async fn scrub_log(
        &self,
        request: Request<ScrubLogRequest>,
    ) -> Result<Response<ScrubLogResponse>, Status> {
        let collection_id = validate_collection_id(&request.into_inner().collection_id)?;

        let report = self
            .store
            .scrub(collection_id)
            .await
            .map_err(|e| storage_status("scrub_log", e))?;

        Ok(Response::new(ScrubLogResponse {
            state: Some(log_state(report.state)),
            record_count: report.record_count,
            lowest_offset: report.lowest_offset,
            highest_offset: report.highest_offset,
            offsets_ordered: report.offsets_ordered,
            contiguous: report.contiguous,
            uncompacted_present: report.uncompacted_present,
        }))
    }

    pub async fn inspect_log_state(
        &self,
        request: Request<InspectLogStateRequest>,
    ) -> Result<Response<InspectLogStateResponse>, Status> {
        let collection_id = validate_collection_id(&request.into_inner().collection_id)?;

        let state = self
            .store
            .get_state(collection_id)
            .await
            .map_err(|e| storage_status("inspect_log_state", e))?;

        Ok(Response::new(InspectLogStateResponse {
            state: state.map(log_state),
        }))
    }

    pub async fn get_bounds(
        &self,
        request: Request<GetBoundsRequest>,
    ) -> Result<Response<GetBoundsResponse>, Status> {
        let collection_id = validate_collection_id(&request.into_inner().collection_id)?;

        let bounds = self
            .store
            .bounds(collection_id)
            .await
            .map_err(|e| storage_status("get_bounds", e))?;

        Ok(Response::new(GetBoundsResponse {
            start: bounds.start,
            limit: bounds.limit,
        }))
    }

    pub async fn get_total_uncompacted(
        &self,
        _request: Request<GetTotalUncompactedRequest>,
    ) -> Result<Response<GetTotalUncompactedResponse>, Status> {
        let total_uncompacted = self
            .store
            .total_uncompacted()
            .await
            .map_err(|e| storage_status("get_total_uncompacted", e))?;

        Ok(Response::new(GetTotalUncompactedResponse { total_uncompacted }))
    }

    pub async fn purge_compacted(
        &self,
        _request: Request<PurgeCompactedRequest>,
    ) -> Result<Response<PurgeCompactedResponse>, Status> {
        let records_purged = self
            .gc
            .purge_compacted()
            .await
            .map_err(|e| storage_status("purge_compacted", e))?;

        Ok(Response::new(PurgeCompactedResponse { records_purged }))
    }

    /// Run one garbage collection pass.
    ///
    /// Partial progress is reported as success. Only a pass in which the
    /// catalog answered for none of the stored collections is `Unavailable`.
    pub async fn garbage_collect(
        &self,
        _request: Request<GarbageCollectRequest>,
    ) -> Result<Response<GarbageCollectResponse>, Status> {
        let report = self
            .gc
            .run_once()
            .await
            .map_err(|e| storage_status("garbage_collect", e))?;

        if report.reap.checked == 0 && report.reap.skipped > 0 {
            return Err(Status::unavailable(errmsg::CATALOG_UNAVAILABLE));
        }

        Ok(Response::new(GarbageCollectResponse {
            records_purged: report.purged,
            collections_reaped: report.reap.reaped,
            collections_skipped: report.reap.skipped as u64,
        }))
    }
}
