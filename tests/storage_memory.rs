//! In-memory storage integration tests.
//!
//! Run with: cargo test --test storage_memory
//!
//! Runs the shared LogStore contract against the in-memory store that backs
//! unit tests and the facade.

mod storage;

use recordlog::storage::MemoryLogStore;

#[tokio::test]
async fn test_memory_log_store() {
    println!("=== Memory LogStore Tests ===");

    let store = MemoryLogStore::new();

    run_log_store_tests!(&store);

    println!("=== All Memory LogStore tests PASSED ===");
}
