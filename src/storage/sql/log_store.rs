//! Unified SQL LogStore implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.
//!
//! Mutating transactions always open with a write so that SQLite takes its
//! write lock up front instead of upgrading a read lock mid-transaction.
//! Locking reads only run on backends with row locks.
//!
//! sea-query statements are not `Send`; each one is rendered to a string
//! before the next await.

use std::marker::PhantomData;

use super::SqlDatabase;
use crate::storage::LogStore;

/// Records per multi-row INSERT statement.
pub(crate) const INSERT_CHUNK_SIZE: usize = 500;

/// Collection ids per DELETE ... IN (...) statement.
pub(crate) const DELETE_CHUNK_SIZE: usize = 500;

/// SQL-based implementation of LogStore.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlLogStore<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlLogStore<DB> {
    /// Create a new SQL log store with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

/// Macro to implement LogStore for a specific SQL backend.
macro_rules! impl_log_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlLogStore<$db_type> {
            /// Create the log tables if they do not exist.
            pub async fn init(&self) -> crate::storage::Result<()> {
                for statement in <$db_type as SqlDatabase>::SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl LogStore for SqlLogStore<$db_type> {
            async fn push(
                &self,
                collection_id: crate::types::CollectionId,
                records: Vec<Vec<u8>>,
            ) -> crate::storage::Result<crate::types::PushOutcome> {
                use sea_query::{Expr, Query};
                use sqlx::Row;

                use crate::storage::schema::{
                    create_log_row, insert_records, state_row, CollectionLogs,
                };
                use crate::storage::sql::query::insert_error;
                use crate::types::{now_nanos, PushOutcome};

                if records.is_empty() {
                    let sealed = self
                        .get_state(collection_id)
                        .await?
                        .map(|state| state.is_sealed)
                        .unwrap_or(false);
                    return Ok(PushOutcome {
                        records_written: 0,
                        sealed,
                    });
                }

                let id = collection_id.to_string();
                let mut tx = self.pool.begin().await?;

                let sql = <$db_type>::build_insert(create_log_row(&id, false));
                sqlx::query(&sql).execute(&mut *tx).await?;

                let sql = {
                    let mut select = state_row(&id);
                    <$db_type>::lock_for_update(&mut select);
                    <$db_type>::build_select(select)
                };
                let row = sqlx::query(&sql).fetch_one(&mut *tx).await?;
                let enumeration_offset: i64 = row.try_get("enumeration_offset")?;
                let is_sealed: bool = row.try_get("is_sealed")?;

                if is_sealed {
                    tx.rollback().await?;
                    tracing::debug!(collection_id = %collection_id, "Push rejected, log is sealed");
                    return Ok(PushOutcome::sealed());
                }

                let timestamp = now_nanos();
                let count = records.len();
                let mut next_offset = enumeration_offset + 1;
                let mut pending = records.into_iter();
                loop {
                    let chunk: Vec<Vec<u8>> = pending.by_ref().take(INSERT_CHUNK_SIZE).collect();
                    if chunk.is_empty() {
                        break;
                    }

                    let first_offset = next_offset;
                    let sql = {
                        let mut insert = insert_records();
                        for record in chunk {
                            insert.values_panic([
                                id.as_str().into(),
                                next_offset.into(),
                                timestamp.into(),
                                record.into(),
                            ]);
                            next_offset += 1;
                        }
                        <$db_type>::build_insert(insert)
                    };

                    sqlx::query(&sql)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| insert_error(e, collection_id, first_offset))?;
                }

                let sql = <$db_type>::build_update(
                    Query::update()
                        .table(CollectionLogs::Table)
                        .value(CollectionLogs::EnumerationOffset, next_offset - 1)
                        .and_where(Expr::col(CollectionLogs::CollectionId).eq(id.as_str()))
                        .to_owned(),
                );
                sqlx::query(&sql).execute(&mut *tx).await?;

                tx.commit().await?;

                tracing::debug!(
                    collection_id = %collection_id,
                    count,
                    enumeration_offset = next_offset - 1,
                    "Pushed records"
                );
                Ok(PushOutcome::written(count))
            }

            async fn pull(
                &self,
                collection_id: crate::types::CollectionId,
                start_offset: i64,
                batch_size: usize,
                end_timestamp: i64,
            ) -> crate::storage::Result<Vec<crate::types::RecordEntry>> {
                use sea_query::{Expr, Order, Query};
                use sqlx::Row;

                use crate::storage::schema::RecordLogs;
                use crate::types::RecordEntry;

                if batch_size == 0 {
                    return Ok(Vec::new());
                }

                let sql = <$db_type>::build_select(
                    Query::select()
                        .columns([RecordLogs::LogOffset, RecordLogs::Ts, RecordLogs::Record])
                        .from(RecordLogs::Table)
                        .and_where(
                            Expr::col(RecordLogs::CollectionId).eq(collection_id.to_string()),
                        )
                        .and_where(Expr::col(RecordLogs::LogOffset).gte(start_offset))
                        .and_where(Expr::col(RecordLogs::Ts).lte(end_timestamp))
                        .order_by(RecordLogs::LogOffset, Order::Asc)
                        .limit(batch_size as u64)
                        .to_owned(),
                );
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                rows.iter()
                    .map(|row| -> crate::storage::Result<RecordEntry> {
                        Ok(RecordEntry {
                            log_offset: row.try_get("log_offset")?,
                            record: row.try_get("record")?,
                            timestamp: row.try_get("ts")?,
                        })
                    })
                    .collect()
            }

            async fn scout(
                &self,
                min_compaction_size: u64,
            ) -> crate::storage::Result<Vec<crate::types::CollectionInfo>> {
                use sqlx::Row;

                use crate::storage::schema::scout_query;
                use crate::storage::sql::query::stored_collection_id;
                use crate::types::CollectionInfo;

                let threshold = i64::try_from(min_compaction_size).unwrap_or(i64::MAX);
                let rows = sqlx::query(&scout_query(threshold))
                    .fetch_all(&self.pool)
                    .await?;

                rows.iter()
                    .map(|row| -> crate::storage::Result<CollectionInfo> {
                        let id: String = row.try_get("collection_id")?;
                        Ok(CollectionInfo {
                            collection_id: stored_collection_id(&id)?,
                            first_log_offset: row.try_get("log_offset")?,
                            first_log_ts: row.try_get("ts")?,
                        })
                    })
                    .collect()
            }

            async fn advance_compaction_offset(
                &self,
                collection_id: crate::types::CollectionId,
                new_offset: i64,
            ) -> crate::storage::Result<()> {
                use sea_query::{Expr, Query};

                use crate::storage::schema::CollectionLogs;
                use crate::storage::StorageError;

                // Single conditional UPDATE: either the whole check-and-set
                // applies or nothing does.
                let sql = <$db_type>::build_update(
                    Query::update()
                        .table(CollectionLogs::Table)
                        .value(CollectionLogs::CompactionOffset, new_offset)
                        .and_where(
                            Expr::col(CollectionLogs::CollectionId).eq(collection_id.to_string()),
                        )
                        .and_where(Expr::col(CollectionLogs::CompactionOffset).lte(new_offset))
                        .and_where(Expr::col(CollectionLogs::EnumerationOffset).gte(new_offset))
                        .to_owned(),
                );
                let result = sqlx::query(&sql).execute(&self.pool).await?;
                if result.rows_affected() > 0 {
                    return Ok(());
                }

                match self.get_state(collection_id).await? {
                    None => Err(StorageError::UnknownCollection(collection_id)),
                    Some(state) => Err(StorageError::InvalidCompactionOffset {
                        collection_id,
                        requested: new_offset,
                        current: state.compaction_offset,
                        enumeration: state.enumeration_offset,
                    }),
                }
            }

            async fn rollback_compaction_offset(
                &self,
                collection_id: crate::types::CollectionId,
                new_offset: i64,
            ) -> crate::storage::Result<()> {
                use crate::storage::schema::{rollback_compaction, state_row};
                use crate::storage::StorageError;

                if new_offset >= 0 {
                    let id = collection_id.to_string();
                    let mut tx = self.pool.begin().await?;

                    // Wait out any purge holding the state row, so the
                    // presence count below sees what it deleted.
                    if <$db_type as SqlDatabase>::ROW_LOCKS {
                        let sql = {
                            let mut select = state_row(&id);
                            <$db_type>::lock_for_update(&mut select);
                            <$db_type>::build_select(select)
                        };
                        sqlx::query(&sql).fetch_optional(&mut *tx).await?;
                    }

                    let sql = <$db_type>::build_update(rollback_compaction(&id, new_offset));
                    let result = sqlx::query(&sql).execute(&mut *tx).await?;
                    if result.rows_affected() > 0 {
                        tx.commit().await?;
                        return Ok(());
                    }
                    tx.rollback().await?;
                }

                let Some(state) = self.get_state(collection_id).await? else {
                    return Err(StorageError::UnknownCollection(collection_id));
                };
                if new_offset < 0 || new_offset > state.compaction_offset {
                    return Err(StorageError::InvalidCompactionOffset {
                        collection_id,
                        requested: new_offset,
                        current: state.compaction_offset,
                        enumeration: state.enumeration_offset,
                    });
                }
                Err(StorageError::RollbackPastPurge {
                    collection_id,
                    requested: new_offset,
                })
            }

            async fn seal(
                &self,
                collection_id: crate::types::CollectionId,
            ) -> crate::storage::Result<crate::types::CollectionLogState> {
                use crate::storage::schema::create_log_row;
                use crate::storage::StorageError;

                let sql = <$db_type>::build_insert(create_log_row(&collection_id.to_string(), true));
                sqlx::query(&sql).execute(&self.pool).await?;

                tracing::info!(collection_id = %collection_id, "Sealed log");

                // The row can only disappear again through reaping.
                self.get_state(collection_id)
                    .await?
                    .ok_or(StorageError::UnknownCollection(collection_id))
            }

            async fn fork(
                &self,
                source: crate::types::CollectionId,
                target: crate::types::CollectionId,
            ) -> crate::storage::Result<u64> {
                use sea_query::{Expr, Order, Query};
                use sqlx::Row;

                use crate::storage::schema::{
                    create_log_row, insert_records, state_row, CollectionLogs, RecordLogs,
                };
                use crate::storage::sql::query::insert_error;
                use crate::storage::StorageError;

                let source_id = source.to_string();
                let target_id = target.to_string();
                let mut tx = self.pool.begin().await?;

                let sql = <$db_type>::build_insert(create_log_row(&target_id, false));
                let created = sqlx::query(&sql).execute(&mut *tx).await?;
                if created.rows_affected() == 0 {
                    return Err(StorageError::CollectionExists(target));
                }

                let sql = {
                    let mut select = state_row(&source_id);
                    <$db_type>::lock_for_update(&mut select);
                    <$db_type>::build_select(select)
                };
                let Some(row) = sqlx::query(&sql).fetch_optional(&mut *tx).await? else {
                    return Err(StorageError::CollectionNotFound(source));
                };
                let enumeration_offset: i64 = row.try_get("enumeration_offset")?;
                let compaction_offset: i64 = row.try_get("compaction_offset")?;

                let sql = <$db_type>::build_select(
                    Query::select()
                        .columns([RecordLogs::LogOffset, RecordLogs::Ts, RecordLogs::Record])
                        .from(RecordLogs::Table)
                        .and_where(Expr::col(RecordLogs::CollectionId).eq(source_id.as_str()))
                        .order_by(RecordLogs::LogOffset, Order::Asc)
                        .to_owned(),
                );
                let rows = sqlx::query(&sql).fetch_all(&mut *tx).await?;

                for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
                    let mut first_offset = None;
                    let sql = {
                        let mut insert = insert_records();
                        for row in chunk {
                            let log_offset: i64 = row.try_get("log_offset")?;
                            let ts: i64 = row.try_get("ts")?;
                            let record: Vec<u8> = row.try_get("record")?;
                            first_offset.get_or_insert(log_offset);
                            insert.values_panic([
                                target_id.as_str().into(),
                                log_offset.into(),
                                ts.into(),
                                record.into(),
                            ]);
                        }
                        <$db_type>::build_insert(insert)
                    };
                    sqlx::query(&sql)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| insert_error(e, target, first_offset.unwrap_or(0)))?;
                }

                let sql = <$db_type>::build_update(
                    Query::update()
                        .table(CollectionLogs::Table)
                        .values([
                            (CollectionLogs::EnumerationOffset, enumeration_offset.into()),
                            (CollectionLogs::CompactionOffset, compaction_offset.into()),
                        ])
                        .and_where(Expr::col(CollectionLogs::CollectionId).eq(target_id.as_str()))
                        .to_owned(),
                );
                sqlx::query(&sql).execute(&mut *tx).await?;

                tx.commit().await?;

                let copied = rows.len() as u64;
                tracing::info!(
                    source = %source,
                    target = %target,
                    copied,
                    enumeration_offset,
                    "Forked log"
                );
                Ok(copied)
            }

            async fn purge_compacted(&self) -> crate::storage::Result<u64> {
                use sqlx::Row;

                use crate::storage::schema::{purge_collection, state_row, PURGE_CANDIDATES};

                let candidates = sqlx::query(PURGE_CANDIDATES)
                    .fetch_all(&self.pool)
                    .await?;

                let mut purged = 0;
                for row in candidates {
                    let id: String = row.try_get("collection_id")?;
                    let mut tx = self.pool.begin().await?;

                    // Pin the compaction offset until the delete commits.
                    if <$db_type as SqlDatabase>::ROW_LOCKS {
                        let sql = {
                            let mut select = state_row(&id);
                            <$db_type>::lock_for_share(&mut select);
                            <$db_type>::build_select(select)
                        };
                        sqlx::query(&sql).fetch_optional(&mut *tx).await?;
                    }

                    let sql = <$db_type>::build_delete(purge_collection(&id));
                    purged += sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();
                    tx.commit().await?;
                }

                Ok(purged)
            }

            async fn list_collection_ids(
                &self,
            ) -> crate::storage::Result<Vec<crate::types::CollectionId>> {
                use sqlx::Row;

                use crate::storage::schema::LIST_COLLECTION_IDS;
                use crate::storage::sql::query::stored_collection_id;

                let rows = sqlx::query(LIST_COLLECTION_IDS)
                    .fetch_all(&self.pool)
                    .await?;

                rows.iter()
                    .map(|row| -> crate::storage::Result<crate::types::CollectionId> {
                        let id: String = row.try_get("collection_id")?;
                        stored_collection_id(&id)
                    })
                    .collect()
            }

            async fn delete_collections(
                &self,
                collection_ids: &[crate::types::CollectionId],
            ) -> crate::storage::Result<u64> {
                use sea_query::{Expr, Query};

                use crate::storage::schema::{CollectionLogs, RecordLogs};

                if collection_ids.is_empty() {
                    return Ok(0);
                }

                let mut tx = self.pool.begin().await?;
                let mut deleted = 0;

                for chunk in collection_ids.chunks(DELETE_CHUNK_SIZE) {
                    let ids: Vec<String> = chunk.iter().map(|id| id.to_string()).collect();

                    // State rows first: the delete waits on any push holding
                    // the row, and the record delete that follows runs after
                    // that push committed.
                    let sql = <$db_type>::build_delete(
                        Query::delete()
                            .from_table(CollectionLogs::Table)
                            .and_where(Expr::col(CollectionLogs::CollectionId).is_in(ids.clone()))
                            .to_owned(),
                    );
                    deleted += sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();

                    let sql = <$db_type>::build_delete(
                        Query::delete()
                            .from_table(RecordLogs::Table)
                            .and_where(Expr::col(RecordLogs::CollectionId).is_in(ids))
                            .to_owned(),
                    );
                    sqlx::query(&sql).execute(&mut *tx).await?;
                }

                tx.commit().await?;
                Ok(deleted)
            }

            async fn get_state(
                &self,
                collection_id: crate::types::CollectionId,
            ) -> crate::storage::Result<Option<crate::types::CollectionLogState>> {
                use sqlx::Row;

                use crate::storage::schema::state_row;
                use crate::types::CollectionLogState;

                let sql = <$db_type>::build_select(state_row(&collection_id.to_string()));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

                match row {
                    Some(row) => Ok(Some(CollectionLogState {
                        collection_id,
                        enumeration_offset: row.try_get("enumeration_offset")?,
                        compaction_offset: row.try_get("compaction_offset")?,
                        is_sealed: row.try_get("is_sealed")?,
                    })),
                    None => Ok(None),
                }
            }

            async fn scrub(
                &self,
                collection_id: crate::types::CollectionId,
            ) -> crate::storage::Result<crate::types::ScrubReport> {
                use sqlx::Row;

                use crate::storage::schema::scrub_query;
                use crate::storage::StorageError;
                use crate::types::{CollectionLogState, ScrubReport};

                let sql = <$db_type>::build_select(scrub_query(&collection_id.to_string()));
                let row = sqlx::query(&sql)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(StorageError::CollectionNotFound(collection_id))?;

                let state = CollectionLogState {
                    collection_id,
                    enumeration_offset: row.try_get("enumeration_offset")?,
                    compaction_offset: row.try_get("compaction_offset")?,
                    is_sealed: row.try_get("is_sealed")?,
                };
                let report = ScrubReport::evaluate(
                    state,
                    row.try_get("record_count")?,
                    row.try_get("lowest_offset")?,
                    row.try_get("highest_offset")?,
                );

                if !report.is_consistent() {
                    tracing::warn!(
                        collection_id = %collection_id,
                        record_count = report.record_count,
                        enumeration_offset = state.enumeration_offset,
                        compaction_offset = state.compaction_offset,
                        "Scrub found inconsistent log"
                    );
                }
                Ok(report)
            }

            async fn total_uncompacted(&self) -> crate::storage::Result<u64> {
                use sqlx::Row;

                use crate::storage::schema::TOTAL_UNCOMPACTED;

                let row = sqlx::query(TOTAL_UNCOMPACTED).fetch_one(&self.pool).await?;
                let total: i64 = row.try_get("total")?;
                Ok(total.max(0) as u64)
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_log_store!(super::postgres::Postgres, "postgres");
impl_log_store!(super::sqlite::Sqlite, "sqlite");
