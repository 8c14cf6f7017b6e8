//! LogStore interface tests.
//!
//! These tests verify the contract of the LogStore trait.
//! Each storage implementation should run these tests.
//!
//! Stores are shared between tests, so every test works on fresh collection
//! ids and only asserts on its own collections when an operation spans the
//! whole store (purge, scout, totals).

use std::time::Duration;

use recordlog::storage::{LogStore, StorageError};
use recordlog::types::{CollectionId, LogBounds};

fn records(prefix: &str, n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| format!("{}-{}", prefix, i).into_bytes())
        .collect()
}

async fn offsets<S: LogStore>(store: &S, id: CollectionId) -> Vec<i64> {
    store
        .pull(id, 0, 10_000, i64::MAX)
        .await
        .expect("pull should succeed")
        .iter()
        .map(|entry| entry.log_offset)
        .collect()
}

// =============================================================================
// LogStore::push tests
// =============================================================================

pub async fn test_push_assigns_offsets_from_one<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let outcome = store
        .push(id, records("a", 3))
        .await
        .expect("push should succeed");
    assert_eq!(outcome.records_written, 3);
    assert!(!outcome.sealed);

    assert_eq!(offsets(store, id).await, vec![1, 2, 3]);
    let state = store.get_state(id).await.unwrap().expect("state should exist");
    assert_eq!(state.enumeration_offset, 3);
    assert_eq!(state.compaction_offset, 0);
    assert!(!state.is_sealed);
}

pub async fn test_push_continues_without_gap<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    store.push(id, records("a", 2)).await.unwrap();
    store.push(id, records("b", 3)).await.unwrap();

    assert_eq!(offsets(store, id).await, vec![1, 2, 3, 4, 5]);

    let pulled = store.pull(id, 3, 1, i64::MAX).await.unwrap();
    assert_eq!(pulled[0].record, b"b-0".to_vec(), "offset 3 is first of second push");
}

pub async fn test_empty_push_writes_nothing<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let outcome = store.push(id, Vec::new()).await.unwrap();
    assert_eq!(outcome.records_written, 0);
    assert!(!outcome.sealed);
    assert!(
        store.get_state(id).await.unwrap().is_none(),
        "empty push should not create a log"
    );

    store.seal(id).await.unwrap();
    let outcome = store.push(id, Vec::new()).await.unwrap();
    assert_eq!(outcome.records_written, 0);
    assert!(outcome.sealed, "empty push reports the current sealed flag");
}

pub async fn test_push_round_trips_bytes<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    let payloads = vec![
        vec![0u8, 0, 0],
        Vec::new(),
        (0..=255u8).collect::<Vec<u8>>(),
        vec![0xff; 4096],
    ];

    store.push(id, payloads.clone()).await.unwrap();

    let pulled: Vec<Vec<u8>> = store
        .pull(id, 1, 10, i64::MAX)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.record)
        .collect();
    assert_eq!(pulled, payloads);
}

pub async fn test_push_large_batch<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let outcome = store.push(id, records("bulk", 1234)).await.unwrap();
    assert_eq!(outcome.records_written, 1234);

    let offsets = offsets(store, id).await;
    assert_eq!(offsets.len(), 1234);
    assert_eq!(offsets.first(), Some(&1));
    assert_eq!(offsets.last(), Some(&1234));
}

// =============================================================================
// LogStore::pull tests
// =============================================================================

pub async fn test_pull_unknown_collection_is_empty<S: LogStore>(store: &S) {
    let pulled = store
        .pull(CollectionId::new(), 1, 100, i64::MAX)
        .await
        .expect("pull should succeed");
    assert!(pulled.is_empty());
}

pub async fn test_pull_start_and_batch_size<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 5)).await.unwrap();

    let pulled = store.pull(id, 2, 2, i64::MAX).await.unwrap();
    let got: Vec<i64> = pulled.iter().map(|e| e.log_offset).collect();
    assert_eq!(got, vec![2, 3]);

    assert!(store.pull(id, 1, 0, i64::MAX).await.unwrap().is_empty());
    assert!(store.pull(id, 6, 10, i64::MAX).await.unwrap().is_empty());
}

pub async fn test_pull_end_timestamp<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("early", 2)).await.unwrap();
    let first_ts = store.pull(id, 1, 1, i64::MAX).await.unwrap()[0].timestamp;

    tokio::time::sleep(Duration::from_millis(2)).await;
    store.push(id, records("late", 2)).await.unwrap();

    let bounded = store.pull(id, 1, 10, first_ts).await.unwrap();
    let got: Vec<i64> = bounded.iter().map(|e| e.log_offset).collect();
    assert_eq!(got, vec![1, 2]);

    assert!(store.pull(id, 1, 10, first_ts - 1).await.unwrap().is_empty());
}

pub async fn test_pull_below_compaction_offset<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 3)).await.unwrap();
    store.advance_compaction_offset(id, 2).await.unwrap();

    assert_eq!(offsets(store, id).await, vec![1, 2, 3]);
}

// =============================================================================
// Compaction offset tests
// =============================================================================

pub async fn test_advance_and_purge_leave_suffix<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 5)).await.unwrap();

    store.advance_compaction_offset(id, 3).await.unwrap();
    let purged = store.purge_compacted().await.unwrap();
    assert!(purged >= 3, "purge should remove at least our 3 records");

    assert_eq!(offsets(store, id).await, vec![4, 5]);
    let state = store.get_state(id).await.unwrap().unwrap();
    assert_eq!(state.compaction_offset, 3);
    assert_eq!(state.enumeration_offset, 5);

    store.purge_compacted().await.unwrap();
    assert_eq!(offsets(store, id).await, vec![4, 5], "purge is idempotent");
}

pub async fn test_advance_unknown_collection<S: LogStore>(store: &S) {
    let err = store
        .advance_compaction_offset(CollectionId::new(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UnknownCollection(_)), "got {:?}", err);
}

pub async fn test_advance_rejects_backward_and_beyond<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 4)).await.unwrap();
    store.advance_compaction_offset(id, 2).await.unwrap();

    let err = store.advance_compaction_offset(id, 1).await.unwrap_err();
    assert!(
        matches!(err, StorageError::InvalidCompactionOffset { requested: 1, current: 2, .. }),
        "got {:?}",
        err
    );

    let err = store.advance_compaction_offset(id, 5).await.unwrap_err();
    assert!(
        matches!(err, StorageError::InvalidCompactionOffset { enumeration: 4, .. }),
        "got {:?}",
        err
    );

    store
        .advance_compaction_offset(id, 2)
        .await
        .expect("advancing to the current offset is a no-op");
    store.advance_compaction_offset(id, 4).await.unwrap();
    assert_eq!(store.get_state(id).await.unwrap().unwrap().compaction_offset, 4);
}

pub async fn test_rollback_within_present_range<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 5)).await.unwrap();
    store.advance_compaction_offset(id, 4).await.unwrap();

    store.rollback_compaction_offset(id, 2).await.unwrap();
    assert_eq!(store.get_state(id).await.unwrap().unwrap().compaction_offset, 2);

    store.rollback_compaction_offset(id, 0).await.unwrap();
    assert_eq!(store.get_state(id).await.unwrap().unwrap().compaction_offset, 0);
}

pub async fn test_rollback_rejections<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let err = store.rollback_compaction_offset(id, 0).await.unwrap_err();
    assert!(matches!(err, StorageError::UnknownCollection(_)), "got {:?}", err);

    store.push(id, records("a", 5)).await.unwrap();
    store.advance_compaction_offset(id, 3).await.unwrap();
    store.purge_compacted().await.unwrap();

    let err = store.rollback_compaction_offset(id, 2).await.unwrap_err();
    assert!(
        matches!(err, StorageError::RollbackPastPurge { requested: 2, .. }),
        "got {:?}",
        err
    );

    let err = store.rollback_compaction_offset(id, 4).await.unwrap_err();
    assert!(
        matches!(err, StorageError::InvalidCompactionOffset { .. }),
        "got {:?}",
        err
    );

    let err = store.rollback_compaction_offset(id, -1).await.unwrap_err();
    assert!(
        matches!(err, StorageError::InvalidCompactionOffset { .. }),
        "got {:?}",
        err
    );

    store
        .rollback_compaction_offset(id, 3)
        .await
        .expect("rolling back to the current offset is a no-op");
    assert_eq!(store.get_state(id).await.unwrap().unwrap().compaction_offset, 3);
}

// =============================================================================
// Scout tests
// =============================================================================

pub async fn test_scout_membership<S: LogStore>(store: &S) {
    let deep = CollectionId::new();
    let shallow = CollectionId::new();
    let sealed = CollectionId::new();
    let clean = CollectionId::new();

    store.push(deep, records("d", 3)).await.unwrap();
    store.advance_compaction_offset(deep, 1).await.unwrap();
    store.push(shallow, records("s", 1)).await.unwrap();
    store.push(sealed, records("x", 5)).await.unwrap();
    store.seal(sealed).await.unwrap();
    store.push(clean, records("c", 2)).await.unwrap();
    store.advance_compaction_offset(clean, 2).await.unwrap();

    let ours = [deep, shallow, sealed, clean];

    let found = store.scout(2).await.unwrap();
    let found: Vec<_> = found
        .into_iter()
        .filter(|info| ours.contains(&info.collection_id))
        .collect();
    assert_eq!(found.len(), 1, "only the deep collection meets threshold 2");
    assert_eq!(found[0].collection_id, deep);
    assert_eq!(found[0].first_log_offset, 2);

    let first = store.pull(deep, 2, 1, i64::MAX).await.unwrap();
    assert_eq!(found[0].first_log_ts, first[0].timestamp);

    let mut found: Vec<CollectionId> = store
        .scout(0)
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.collection_id)
        .filter(|id| ours.contains(id))
        .collect();
    found.sort();
    let mut expected = vec![deep, shallow];
    expected.sort();
    assert_eq!(found, expected, "threshold 0 still excludes clean and sealed logs");
}

pub async fn test_scout_orders_oldest_first<S: LogStore>(store: &S) {
    let older = CollectionId::new();
    let newer = CollectionId::new();

    store.push(older, records("o", 1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    store.push(newer, records("n", 1)).await.unwrap();

    let found: Vec<CollectionId> = store
        .scout(1)
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.collection_id)
        .filter(|id| *id == older || *id == newer)
        .collect();
    assert_eq!(found, vec![older, newer]);
}

// =============================================================================
// Seal tests
// =============================================================================

pub async fn test_sealed_log_rejects_push<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    store.push(id, records("a", 2)).await.unwrap();

    let state = store.seal(id).await.unwrap();
    assert!(state.is_sealed);
    assert_eq!(state.enumeration_offset, 2);

    let outcome = store.push(id, records("b", 3)).await.unwrap();
    assert!(outcome.sealed);
    assert_eq!(outcome.records_written, 0);

    assert_eq!(offsets(store, id).await, vec![1, 2]);
    assert_eq!(store.get_state(id).await.unwrap().unwrap().enumeration_offset, 2);

    let state = store.seal(id).await.expect("seal is idempotent");
    assert!(state.is_sealed);
    assert_eq!(state.enumeration_offset, 2);
}

pub async fn test_seal_creates_empty_log<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let state = store.seal(id).await.unwrap();
    assert!(state.is_sealed);
    assert_eq!(state.enumeration_offset, 0);
    assert_eq!(state.compaction_offset, 0);
    assert!(store.list_collection_ids().await.unwrap().contains(&id));
}

// =============================================================================
// Fork tests
// =============================================================================

pub async fn test_fork_copies_present_records<S: LogStore>(store: &S) {
    let source = CollectionId::new();
    let target = CollectionId::new();
    store.push(source, records("src", 5)).await.unwrap();
    store.advance_compaction_offset(source, 2).await.unwrap();
    store.purge_compacted().await.unwrap();

    let copied = store.fork(source, target).await.unwrap();
    assert_eq!(copied, 3);

    let state = store.get_state(target).await.unwrap().unwrap();
    assert_eq!(state.enumeration_offset, 5);
    assert_eq!(state.compaction_offset, 2);
    assert!(!state.is_sealed);

    let from_source = store.pull(source, 0, 10, i64::MAX).await.unwrap();
    let from_target = store.pull(target, 0, 10, i64::MAX).await.unwrap();
    assert_eq!(from_source, from_target, "offsets, bytes and timestamps preserved");

    store.push(target, records("t", 1)).await.unwrap();
    assert_eq!(offsets(store, target).await, vec![3, 4, 5, 6]);
    assert_eq!(offsets(store, source).await, vec![3, 4, 5], "source unmodified");
}

pub async fn test_fork_of_sealed_source_is_unsealed<S: LogStore>(store: &S) {
    let source = CollectionId::new();
    let target = CollectionId::new();
    store.push(source, records("a", 2)).await.unwrap();
    store.seal(source).await.unwrap();

    store.fork(source, target).await.unwrap();

    assert!(!store.get_state(target).await.unwrap().unwrap().is_sealed);
    assert!(store.get_state(source).await.unwrap().unwrap().is_sealed);
    let outcome = store.push(target, records("b", 1)).await.unwrap();
    assert!(!outcome.sealed);
}

pub async fn test_fork_missing_source<S: LogStore>(store: &S) {
    let source = CollectionId::new();
    let target = CollectionId::new();

    let err = store.fork(source, target).await.unwrap_err();
    assert!(matches!(err, StorageError::CollectionNotFound(id) if id == source));
    assert!(
        store.get_state(target).await.unwrap().is_none(),
        "failed fork leaves no target behind"
    );
}

pub async fn test_fork_existing_target<S: LogStore>(store: &S) {
    let source = CollectionId::new();
    let target = CollectionId::new();
    store.push(source, records("a", 2)).await.unwrap();
    store.push(target, records("b", 1)).await.unwrap();

    let err = store.fork(source, target).await.unwrap_err();
    assert!(matches!(err, StorageError::CollectionExists(id) if id == target));
    assert_eq!(offsets(store, target).await, vec![1]);
}

// =============================================================================
// Collection deletion tests
// =============================================================================

pub async fn test_deleted_collection_restarts_at_one<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    let other = CollectionId::new();
    store.push(id, records("a", 5)).await.unwrap();
    store.push(other, records("o", 2)).await.unwrap();

    assert!(store.list_collection_ids().await.unwrap().contains(&id));
    assert_eq!(store.delete_collections(&[id]).await.unwrap(), 1);

    assert!(store.get_state(id).await.unwrap().is_none());
    assert!(offsets(store, id).await.is_empty());
    assert!(!store.list_collection_ids().await.unwrap().contains(&id));
    assert_eq!(offsets(store, other).await, vec![1, 2], "other logs untouched");

    store.push(id, records("b", 1)).await.unwrap();
    assert_eq!(offsets(store, id).await, vec![1]);

    assert_eq!(store.delete_collections(&[]).await.unwrap(), 0);
    assert_eq!(
        store.delete_collections(&[CollectionId::new()]).await.unwrap(),
        0
    );
}

// =============================================================================
// Inspection tests
// =============================================================================

pub async fn test_scrub_through_lifecycle<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let err = store.scrub(id).await.unwrap_err();
    assert!(matches!(err, StorageError::CollectionNotFound(_)), "got {:?}", err);

    store.push(id, records("a", 4)).await.unwrap();
    let report = store.scrub(id).await.unwrap();
    assert!(report.is_consistent(), "{:?}", report);
    assert_eq!(report.record_count, 4);
    assert_eq!(report.lowest_offset, Some(1));
    assert_eq!(report.highest_offset, Some(4));

    store.advance_compaction_offset(id, 4).await.unwrap();
    store.purge_compacted().await.unwrap();
    let report = store.scrub(id).await.unwrap();
    assert!(report.is_consistent(), "{:?}", report);
    assert_eq!(report.record_count, 0);
    assert_eq!(report.lowest_offset, None);
}

pub async fn test_bounds<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    assert_eq!(store.bounds(id).await.unwrap(), LogBounds::empty());

    store.push(id, records("a", 5)).await.unwrap();
    assert_eq!(store.bounds(id).await.unwrap(), LogBounds { start: 1, limit: 6 });

    store.advance_compaction_offset(id, 3).await.unwrap();
    store.purge_compacted().await.unwrap();
    assert_eq!(store.bounds(id).await.unwrap(), LogBounds { start: 4, limit: 6 });

    store.advance_compaction_offset(id, 5).await.unwrap();
    store.purge_compacted().await.unwrap();
    let bounds = store.bounds(id).await.unwrap();
    assert_eq!(bounds, LogBounds { start: 6, limit: 6 });
    assert!(bounds.is_empty());
}

pub async fn test_total_uncompacted<S: LogStore>(store: &S) {
    let id = CollectionId::new();
    let before = store.total_uncompacted().await.unwrap();

    store.push(id, records("a", 4)).await.unwrap();
    assert_eq!(store.total_uncompacted().await.unwrap(), before + 4);

    store.advance_compaction_offset(id, 3).await.unwrap();
    assert_eq!(store.total_uncompacted().await.unwrap(), before + 1);
}

// =============================================================================
// Concurrency tests
// =============================================================================

pub async fn test_concurrent_pushes_same_collection<S: LogStore>(store: &S) {
    let id = CollectionId::new();

    let pushes = (0..10).map(|writer| store.push(id, records(&format!("w{}", writer), 3)));
    for outcome in futures::future::join_all(pushes).await {
        assert_eq!(outcome.expect("push should succeed").records_written, 3);
    }

    let pulled = store.pull(id, 1, 100, i64::MAX).await.unwrap();
    let got: Vec<i64> = pulled.iter().map(|e| e.log_offset).collect();
    assert_eq!(got, (1..=30).collect::<Vec<i64>>());

    // each push lands as one contiguous block
    for block in pulled.chunks(3) {
        let writer = |entry: &recordlog::types::RecordEntry| {
            String::from_utf8_lossy(&entry.record)
                .split('-')
                .next()
                .map(str::to_string)
        };
        assert!(block.iter().all(|entry| writer(entry) == writer(&block[0])));
    }
}

pub async fn test_concurrent_pushes_distinct_collections<S: LogStore>(store: &S) {
    let ids: Vec<CollectionId> = (0..5).map(|_| CollectionId::new()).collect();

    let pushes = ids
        .iter()
        .flat_map(|id| (0..4).map(move |round| (*id, round)))
        .map(|(id, round)| store.push(id, records(&format!("r{}", round), 2)));
    for outcome in futures::future::join_all(pushes).await {
        outcome.expect("push should succeed");
    }

    for id in ids {
        assert_eq!(offsets(store, id).await, (1..=8).collect::<Vec<i64>>());
        assert!(store.scrub(id).await.unwrap().is_consistent());
    }
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all LogStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_log_store_tests {
    ($store:expr) => {
        use $crate::storage::log_store_tests::*;

        // push tests
        test_push_assigns_offsets_from_one($store).await;
        println!("  test_push_assigns_offsets_from_one: PASSED");

        test_push_continues_without_gap($store).await;
        println!("  test_push_continues_without_gap: PASSED");

        test_empty_push_writes_nothing($store).await;
        println!("  test_empty_push_writes_nothing: PASSED");

        test_push_round_trips_bytes($store).await;
        println!("  test_push_round_trips_bytes: PASSED");

        test_push_large_batch($store).await;
        println!("  test_push_large_batch: PASSED");

        // pull tests
        test_pull_unknown_collection_is_empty($store).await;
        println!("  test_pull_unknown_collection_is_empty: PASSED");

        test_pull_start_and_batch_size($store).await;
        println!("  test_pull_start_and_batch_size: PASSED");

        test_pull_end_timestamp($store).await;
        println!("  test_pull_end_timestamp: PASSED");

        test_pull_below_compaction_offset($store).await;
        println!("  test_pull_below_compaction_offset: PASSED");

        // compaction offset tests
        test_advance_and_purge_leave_suffix($store).await;
        println!("  test_advance_and_purge_leave_suffix: PASSED");

        test_advance_unknown_collection($store).await;
        println!("  test_advance_unknown_collection: PASSED");

        test_advance_rejects_backward_and_beyond($store).await;
        println!("  test_advance_rejects_backward_and_beyond: PASSED");

        test_rollback_within_present_range($store).await;
        println!("  test_rollback_within_present_range: PASSED");

        test_rollback_rejections($store).await;
        println!("  test_rollback_rejections: PASSED");

        // scout tests
        test_scout_membership($store).await;
        println!("  test_scout_membership: PASSED");

        test_scout_orders_oldest_first($store).await;
        println!("  test_scout_orders_oldest_first: PASSED");

        // seal tests
        test_sealed_log_rejects_push($store).await;
        println!("  test_sealed_log_rejects_push: PASSED");

        test_seal_creates_empty_log($store).await;
        println!("  test_seal_creates_empty_log: PASSED");

        // fork tests
        test_fork_copies_present_records($store).await;
        println!("  test_fork_copies_present_records: PASSED");

        test_fork_of_sealed_source_is_unsealed($store).await;
        println!("  test_fork_of_sealed_source_is_unsealed: PASSED");

        test_fork_missing_source($store).await;
        println!("  test_fork_missing_source: PASSED");

        test_fork_existing_target($store).await;
        println!("  test_fork_existing_target: PASSED");

        // deletion tests
        test_deleted_collection_restarts_at_one($store).await;
        println!("  test_deleted_collection_restarts_at_one: PASSED");

        // inspection tests
        test_scrub_through_lifecycle($store).await;
        println!("  test_scrub_through_lifecycle: PASSED");

        test_bounds($store).await;
        println!("  test_bounds: PASSED");

        test_total_uncompacted($store).await;
        println!("  test_total_uncompacted: PASSED");

        // concurrency tests
        test_concurrent_pushes_same_collection($store).await;
        println!("  test_concurrent_pushes_same_collection: PASSED");

        test_concurrent_pushes_distinct_collections($store).await;
        println!("  test_concurrent_pushes_distinct_collections: PASSED");
    };
}
