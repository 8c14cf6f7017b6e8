//! SQL database abstraction trait.

use sea_query::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};

use crate::storage::StorageError;
use crate::types::CollectionId;

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the pool type, schema, and query building methods.
pub trait SqlDatabase: Send + Sync + 'static {
    /// The connection pool type for this database.
    type Pool: Clone + Send + Sync;

    /// Statements that create the log tables.
    const SCHEMA: &'static [&'static str];

    /// Build a SQL query string from a sea-query SELECT statement.
    fn build_select(stmt: SelectStatement) -> String;

    /// Build a SQL query string from a sea-query INSERT statement.
    fn build_insert(stmt: InsertStatement) -> String;

    /// Build a SQL query string from a sea-query UPDATE statement.
    fn build_update(stmt: UpdateStatement) -> String;

    /// Build a SQL query string from a sea-query DELETE statement.
    fn build_delete(stmt: DeleteStatement) -> String;

    /// Whether the lock hooks below take row locks.
    ///
    /// When false, the first write of a transaction locks the whole database
    /// and a separate locking read would only turn the transaction into a
    /// read-then-write, so callers skip it.
    const ROW_LOCKS: bool = false;

    /// Take an exclusive lock on the selected state row for the rest of the
    /// transaction.
    fn lock_for_update(_stmt: &mut SelectStatement) {}

    /// Take a shared lock on the selected state row for the rest of the
    /// transaction. Blocks exclusive lockers but not other share lockers.
    fn lock_for_share(_stmt: &mut SelectStatement) {}
}

/// Map a record insert failure, surfacing unique violations as conflicts.
pub(crate) fn insert_error(
    err: sqlx::Error,
    collection_id: CollectionId,
    log_offset: i64,
) -> StorageError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StorageError::OffsetConflict {
                collection_id,
                log_offset,
            }
        }
        _ => StorageError::Database(err),
    }
}

/// Parse a collection id read back from storage.
pub(crate) fn stored_collection_id(value: &str) -> Result<CollectionId, StorageError> {
    CollectionId::parse(value)
        .map_err(|e| StorageError::Corrupt(format!("collection_id {:?}: {}", value, e)))
}
