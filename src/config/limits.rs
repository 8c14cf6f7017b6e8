//! Request limits enforced by the service facade.

use serde::Deserialize;

/// Default maximum records accepted by one push.
pub const DEFAULT_MAX_RECORDS_PER_PUSH: usize = 1000;

/// Default maximum encoded size of one record (1 MB).
pub const DEFAULT_MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Default maximum records returned by one pull.
pub const DEFAULT_MAX_PULL_BATCH: usize = 1000;

/// Request limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum records accepted by one push.
    pub max_records_per_push: usize,

    /// Maximum encoded size of one record in bytes.
    pub max_record_bytes: usize,

    /// Maximum records returned by one pull. Larger requests are clamped.
    pub max_pull_batch: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_records_per_push: DEFAULT_MAX_RECORDS_PER_PUSH,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            max_pull_batch: DEFAULT_MAX_PULL_BATCH,
        }
    }
}
