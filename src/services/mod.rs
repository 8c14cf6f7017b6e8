//! Service implementations.

pub mod errmsg;
pub mod log_service;

pub use log_service::{storage_status, LogService};
