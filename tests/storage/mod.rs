//! Shared storage integration tests.
//!
//! Tests the LogStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod log_store_tests;
