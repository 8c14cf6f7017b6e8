//! Storage implementations.
//!
//! Contains the `LogStore` trait, its error type, and one implementation per
//! backend. SQL backends share one implementation parameterized by database
//! type; the in-memory backend shards a mutex per collection.

use std::sync::Arc;

use tracing::info;

use crate::types::CollectionId;

mod config;
mod log_store;
pub mod memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use config::{PostgresConfig, SqliteConfig, StorageConfig, StorageType};
pub use log_store::LogStore;
pub use memory::MemoryLogStore;

#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresLogStore;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteLogStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// How callers should treat a storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Safe to retry after fixing the request; nothing was applied.
    Validation,
    /// Lost a race. Retry the whole logical operation.
    Conflict,
    /// The named log does not exist.
    NotFound,
    /// The target log already exists.
    AlreadyExists,
    /// Storage failure or corruption. Never retried automatically.
    Fatal,
}

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Collection {0} has no log")]
    UnknownCollection(CollectionId),

    #[error("Collection not found: {0}")]
    CollectionNotFound(CollectionId),

    #[error("Collection already has a log: {0}")]
    CollectionExists(CollectionId),

    #[error(
        "Invalid compaction offset for {collection_id}: requested {requested}, \
         current {current}, enumeration {enumeration}"
    )]
    InvalidCompactionOffset {
        collection_id: CollectionId,
        requested: i64,
        current: i64,
        enumeration: i64,
    },

    #[error("Cannot roll back {collection_id} to {requested}: offsets above it were purged")]
    RollbackPastPurge {
        collection_id: CollectionId,
        requested: i64,
    },

    #[error("Offset conflict for {collection_id} at offset {log_offset}")]
    OffsetConflict {
        collection_id: CollectionId,
        log_offset: i64,
    },

    #[error("Corrupt log data: {0}")]
    Corrupt(String),

    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Classify this error for retry and transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::UnknownCollection(_)
            | StorageError::InvalidCompactionOffset { .. }
            | StorageError::RollbackPastPurge { .. } => ErrorKind::Validation,
            StorageError::OffsetConflict { .. } => ErrorKind::Conflict,
            StorageError::CollectionExists(_) => ErrorKind::AlreadyExists,
            StorageError::CollectionNotFound(_) => ErrorKind::NotFound,
            StorageError::Corrupt(_) => ErrorKind::Fatal,
            #[cfg(any(feature = "sqlite", feature = "postgres"))]
            StorageError::Database(_) => ErrorKind::Fatal,
        }
    }

    /// Whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn LogStore>, Box<dyn std::error::Error>> {
    info!(storage_type = ?config.storage_type, "Initializing log storage");

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryLogStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(config.sqlite.max_connections)
                .connect(&format!("sqlite:{}?mode=rwc", config.sqlite.path))
                .await?;

            let store = SqliteLogStore::new(pool);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.postgres.max_connections)
                .connect(&config.postgres.uri)
                .await?;

            let store = PostgresLogStore::new(pool);
            store.init().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageType::Postgres => {
            tracing::error!("PostgreSQL storage requested but 'postgres' feature is not enabled");
            Err("PostgreSQL feature not enabled".into())
        }
    }
}
