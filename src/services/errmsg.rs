//! Error message constants for the log service.
//!
//! User-facing error messages are sanitized to avoid leaking storage details.
//! Full error details are logged internally.

/// Storage failure (sanitized - no engine details).
pub const INTERNAL_ERROR: &str = "Internal service error";

/// Stored payload could not be decoded.
pub const CORRUPT_RECORD: &str = "Stored record could not be decoded";

/// Catalog could not be reached for any collection.
pub const CATALOG_UNAVAILABLE: &str = "Collection catalog temporarily unavailable";
