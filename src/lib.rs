//! recordlog - per-collection record log for vector ingestion
//!
//! A durable append-only log per collection with gap-free 1-based offsets,
//! compaction tracking, sealing, forking, and garbage collection against an
//! external collection catalog.

pub mod catalog;
pub mod client;
pub mod config;
pub mod gc;
pub mod proto;
pub mod services;
pub mod storage;
pub mod types;
pub mod utils;
pub mod validation;
