//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;
use tonic::{Code, Status};

/// Backoff for operations that lost an offset race.
///
/// - Min delay: 5ms
/// - Max delay: 1s
/// - Max attempts: 10
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(10)
        .with_jitter()
}

/// Determines if a gRPC error is retryable (offset conflict only).
///
/// Retryable codes:
/// - `Aborted`: Offset conflict (concurrent push to the same collection)
///
/// Non-retryable:
/// - `InvalidArgument`, `NotFound`, `AlreadyExists`: retrying cannot change
///   the answer.
/// - `Internal`: storage failure.
pub fn is_retryable_status(status: &Status) -> bool {
    matches!(status.code(), Code::Aborted)
}
