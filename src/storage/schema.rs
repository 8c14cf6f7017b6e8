//! Database schema definitions using sea-query.
//!
//! Table and column identifiers, backend DDL, and the statements shared by
//! every SQL backend. Statements are returned unrendered; each backend renders
//! them with its own query builder.

use sea_query::{
    Alias, DeleteStatement, Expr, Iden, InsertStatement, OnConflict, Query, SelectStatement,
    SimpleExpr, UpdateStatement,
};

/// Per-collection log state table schema.
#[derive(Iden)]
pub enum CollectionLogs {
    Table,
    #[iden = "collection_id"]
    CollectionId,
    #[iden = "enumeration_offset"]
    EnumerationOffset,
    #[iden = "compaction_offset"]
    CompactionOffset,
    #[iden = "is_sealed"]
    IsSealed,
}

/// Record entries table schema.
#[derive(Iden)]
pub enum RecordLogs {
    Table,
    #[iden = "collection_id"]
    CollectionId,
    #[iden = "log_offset"]
    LogOffset,
    #[iden = "ts"]
    Ts,
    #[iden = "record"]
    Record,
}

/// SQL for creating the SQLite tables.
pub const SQLITE_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS collection_logs (
    collection_id TEXT NOT NULL PRIMARY KEY,
    enumeration_offset INTEGER NOT NULL DEFAULT 0,
    compaction_offset INTEGER NOT NULL DEFAULT 0,
    is_sealed BOOLEAN NOT NULL DEFAULT FALSE
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS record_logs (
    collection_id TEXT NOT NULL,
    log_offset INTEGER NOT NULL,
    ts INTEGER NOT NULL,
    record BLOB NOT NULL,
    PRIMARY KEY (collection_id, log_offset)
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_record_logs_ts ON record_logs (collection_id, ts)",
];

/// SQL for creating the PostgreSQL tables.
pub const POSTGRES_SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS collection_logs (
    collection_id TEXT NOT NULL PRIMARY KEY,
    enumeration_offset BIGINT NOT NULL DEFAULT 0,
    compaction_offset BIGINT NOT NULL DEFAULT 0,
    is_sealed BOOLEAN NOT NULL DEFAULT FALSE
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS record_logs (
    collection_id TEXT NOT NULL,
    log_offset BIGINT NOT NULL,
    ts BIGINT NOT NULL,
    record BYTEA NOT NULL,
    PRIMARY KEY (collection_id, log_offset)
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_record_logs_ts ON record_logs (collection_id, ts)",
];

/// Collections holding records at or below their compaction offset.
pub const PURGE_CANDIDATES: &str = r#"
SELECT c.collection_id AS collection_id
FROM collection_logs c
WHERE EXISTS (
    SELECT 1 FROM record_logs r
    WHERE r.collection_id = c.collection_id
      AND r.log_offset <= c.compaction_offset
)
"#;

/// Every collection id known to either table.
pub const LIST_COLLECTION_IDS: &str = r#"
SELECT collection_id FROM collection_logs
UNION
SELECT collection_id FROM record_logs
"#;

/// Total uncompacted records across all collections.
pub const TOTAL_UNCOMPACTED: &str = r#"
SELECT CAST(COALESCE(SUM(enumeration_offset - compaction_offset), 0) AS BIGINT) AS total
FROM collection_logs
"#;

/// Oldest uncompacted record of every unsealed collection at least
/// `min_compaction_size` records deep.
pub fn scout_query(min_compaction_size: i64) -> String {
    format!(
        r#"
SELECT c.collection_id AS collection_id, r.log_offset AS log_offset, r.ts AS ts
FROM collection_logs c
JOIN record_logs r
  ON r.collection_id = c.collection_id
 AND r.log_offset = c.compaction_offset + 1
WHERE c.is_sealed = FALSE
  AND c.enumeration_offset - c.compaction_offset >= {}
ORDER BY r.ts ASC, c.collection_id ASC
"#,
        min_compaction_size.max(1)
    )
}

/// Zeroed state row for a collection, left alone if one exists.
pub fn create_log_row(collection_id: &str, sealed: bool) -> InsertStatement {
    let mut on_conflict = OnConflict::column(CollectionLogs::CollectionId);
    if sealed {
        on_conflict.update_column(CollectionLogs::IsSealed);
    } else {
        on_conflict.do_nothing();
    }

    Query::insert()
        .into_table(CollectionLogs::Table)
        .columns([
            CollectionLogs::CollectionId,
            CollectionLogs::EnumerationOffset,
            CollectionLogs::CompactionOffset,
            CollectionLogs::IsSealed,
        ])
        .values_panic([collection_id.into(), 0i64.into(), 0i64.into(), sealed.into()])
        .on_conflict(on_conflict)
        .to_owned()
}

/// One collection's state row.
pub fn state_row(collection_id: &str) -> SelectStatement {
    Query::select()
        .columns([
            CollectionLogs::EnumerationOffset,
            CollectionLogs::CompactionOffset,
            CollectionLogs::IsSealed,
        ])
        .from(CollectionLogs::Table)
        .and_where(Expr::col(CollectionLogs::CollectionId).eq(collection_id))
        .to_owned()
}

/// Empty multi-row insert into `record_logs`.
pub fn insert_records() -> InsertStatement {
    Query::insert()
        .into_table(RecordLogs::Table)
        .columns([
            RecordLogs::CollectionId,
            RecordLogs::LogOffset,
            RecordLogs::Ts,
            RecordLogs::Record,
        ])
        .to_owned()
}

/// Move a collection's compaction offset back to `new_offset`, provided every
/// offset in `(new_offset, compaction_offset]` is still present.
///
/// Matches zero rows when the collection has no log, `new_offset` is ahead
/// of the current compaction offset, or the range was partly purged.
pub fn rollback_compaction(collection_id: &str, new_offset: i64) -> UpdateStatement {
    let present = Query::select()
        .expr(Expr::col((RecordLogs::Table, RecordLogs::LogOffset)).count())
        .from(RecordLogs::Table)
        .and_where(
            Expr::col((RecordLogs::Table, RecordLogs::CollectionId))
                .equals((CollectionLogs::Table, CollectionLogs::CollectionId)),
        )
        .and_where(Expr::col((RecordLogs::Table, RecordLogs::LogOffset)).gt(new_offset))
        .and_where(
            Expr::col((RecordLogs::Table, RecordLogs::LogOffset))
                .lte(Expr::col((CollectionLogs::Table, CollectionLogs::CompactionOffset))),
        )
        .to_owned();

    Query::update()
        .table(CollectionLogs::Table)
        .value(CollectionLogs::CompactionOffset, new_offset)
        .and_where(Expr::col(CollectionLogs::CollectionId).eq(collection_id))
        .and_where(Expr::col(CollectionLogs::CompactionOffset).gte(new_offset))
        .and_where(
            Expr::expr(sub_query(present)).eq(Expr::col((
                CollectionLogs::Table,
                CollectionLogs::CompactionOffset,
            ))
            .sub(new_offset)),
        )
        .to_owned()
}

/// Delete one collection's records at or below its compaction offset.
pub fn purge_collection(collection_id: &str) -> DeleteStatement {
    let compaction = Query::select()
        .column(CollectionLogs::CompactionOffset)
        .from(CollectionLogs::Table)
        .and_where(Expr::col(CollectionLogs::CollectionId).eq(collection_id))
        .to_owned();

    Query::delete()
        .from_table(RecordLogs::Table)
        .and_where(Expr::col(RecordLogs::CollectionId).eq(collection_id))
        .and_where(Expr::col(RecordLogs::LogOffset).lte(sub_query(compaction)))
        .to_owned()
}

/// State row plus present-record statistics for one collection, read as a
/// single statement.
pub fn scrub_query(collection_id: &str) -> SelectStatement {
    let stat = |expr: SimpleExpr| {
        sub_query(
            Query::select()
                .expr(expr)
                .from(RecordLogs::Table)
                .and_where(
                    Expr::col((RecordLogs::Table, RecordLogs::CollectionId))
                        .equals((CollectionLogs::Table, CollectionLogs::CollectionId)),
                )
                .to_owned(),
        )
    };

    Query::select()
        .columns([
            (CollectionLogs::Table, CollectionLogs::EnumerationOffset),
            (CollectionLogs::Table, CollectionLogs::CompactionOffset),
            (CollectionLogs::Table, CollectionLogs::IsSealed),
        ])
        .expr_as(
            stat(Expr::col((RecordLogs::Table, RecordLogs::LogOffset)).count()),
            Alias::new("record_count"),
        )
        .expr_as(
            stat(Expr::col((RecordLogs::Table, RecordLogs::LogOffset)).min()),
            Alias::new("lowest_offset"),
        )
        .expr_as(
            stat(Expr::col((RecordLogs::Table, RecordLogs::LogOffset)).max()),
            Alias::new("highest_offset"),
        )
        .from(CollectionLogs::Table)
        .and_where(
            Expr::col((CollectionLogs::Table, CollectionLogs::CollectionId)).eq(collection_id),
        )
        .to_owned()
}

fn sub_query(select: SelectStatement) -> SimpleExpr {
    SimpleExpr::SubQuery(None, Box::new(select.into_sub_query_statement()))
}
