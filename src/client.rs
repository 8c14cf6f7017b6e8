//! In-process client for the log service.
//!
//! Retries operations that lost a race (`Aborted`) with exponential backoff.
//! Every other status is returned to the caller on the first failure.

use std::sync::Arc;

use backon::Retryable;
use tonic::{Request, Status};
use tracing::warn;

use crate::proto::{
    OperationRecord, PullLogsRequest, PushLogsRequest, PushLogsResponse,
    UpdateCollectionLogOffsetRequest,
};
use crate::services::LogService;
use crate::types::CollectionId;
use crate::utils::retry::{conflict_backoff, is_retryable_status};

/// Client handle over a shared `LogService`.
#[derive(Clone)]
pub struct LogClient {
    service: Arc<LogService>,
}

impl LogClient {
    pub fn new(service: Arc<LogService>) -> Self {
        Self { service }
    }

    /// Push records, retrying on offset conflicts.
    pub async fn push(
        &self,
        collection_id: CollectionId,
        records: Vec<OperationRecord>,
    ) -> Result<PushLogsResponse, Status> {
        let request = PushLogsRequest {
            collection_id: collection_id.to_string(),
            records,
        };

        (|| async {
            self.service
                .push_logs(Request::new(request.clone()))
                .await
                .map(|response| response.into_inner())
        })
        .retry(conflict_backoff())
        .when(is_retryable_status)
        .notify(|status, delay| {
            warn!(
                collection_id = %collection_id,
                error = %status.message(),
                delay_ms = delay.as_millis() as u64,
                "Push conflicted, retrying"
            );
        })
        .await
    }

    /// Pull up to `batch_size` records starting at `start_offset`.
    pub async fn pull(
        &self,
        collection_id: CollectionId,
        start_offset: i64,
        batch_size: i32,
    ) -> Result<Vec<(i64, OperationRecord)>, Status> {
        let response = self
            .service
            .pull_logs(Request::new(PullLogsRequest {
                collection_id: collection_id.to_string(),
                start_from_offset: start_offset,
                batch_size,
                end_timestamp: 0,
            }))
            .await?
            .into_inner();

        Ok(response
            .records
            .into_iter()
            .filter_map(|entry| entry.record.map(|record| (entry.log_offset, record)))
            .collect())
    }

    /// Advance the compaction offset, retrying on conflicts.
    pub async fn advance_compaction_offset(
        &self,
        collection_id: CollectionId,
        log_offset: i64,
    ) -> Result<(), Status> {
        let request = UpdateCollectionLogOffsetRequest {
            collection_id: collection_id.to_string(),
            log_offset,
        };

        (|| async {
            self.service
                .update_collection_log_offset(Request::new(request.clone()))
                .await
                .map(|_| ())
        })
        .retry(conflict_backoff())
        .when(is_retryable_status)
        .await
    }
}
