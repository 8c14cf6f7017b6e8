//! Unified SQL storage implementations.
//!
//! This module provides the shared `LogStore` implementation for SQL-based
//! backends (PostgreSQL, SQLite). The implementation is parameterized by
//! database type using the `SqlDatabase` trait.

mod log_store;
mod query;

pub use log_store::SqlLogStore;
pub use query::SqlDatabase;

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::PostgresQueryBuilder;
    use sqlx::PgPool;

    use crate::storage::schema::POSTGRES_SCHEMA;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        const SCHEMA: &'static [&'static str] = POSTGRES_SCHEMA;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        const ROW_LOCKS: bool = true;

        // SELECT ... FOR UPDATE: pushes to the same collection queue on the
        // state row, pushes to other collections proceed.
        fn lock_for_update(stmt: &mut sea_query::SelectStatement) {
            stmt.lock_exclusive();
        }

        // SELECT ... FOR SHARE: purge pins the compaction offset while it
        // deletes, so rollback cannot move it underneath.
        fn lock_for_share(stmt: &mut sea_query::SelectStatement) {
            stmt.lock_shared();
        }
    }

    /// PostgreSQL log store.
    pub type PostgresLogStore = super::SqlLogStore<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.
    //!
    //! SQLite has no row locks. Each mutating transaction opens with a write,
    //! which takes the database write lock, so writers serialize database-wide.

    use sea_query::SqliteQueryBuilder;
    use sqlx::SqlitePool;

    use crate::storage::schema::SQLITE_SCHEMA;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        const SCHEMA: &'static [&'static str] = SQLITE_SCHEMA;

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }
    }

    /// SQLite log store.
    pub type SqliteLogStore = super::SqlLogStore<Sqlite>;
}
