//! recordlog-gc: Record log garbage collector
//!
//! Periodically purges compacted records and reaps the logs of collections
//! the catalog no longer knows.
//!
//! ## Configuration
//! - RECORDLOG_CONFIG: Path to a YAML config file (optional)
//! - RECORDLOG__GC__INTERVAL_SECS, RECORDLOG__CATALOG__ENDPOINT, ...:
//!   overrides for individual settings
//! - RECORDLOG_LOG: Log filter (default: info)

use std::sync::Arc;

use tracing::{info, warn};

use recordlog::catalog::HttpCatalog;
use recordlog::config::Config;
use recordlog::gc::GarbageCollector;
use recordlog::storage::init_storage;
use recordlog::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    let store = init_storage(&config.storage).await?;
    let catalog = Arc::new(HttpCatalog::new(&config.catalog)?);

    if !config.gc.enabled {
        warn!("Garbage collection disabled in configuration, exiting");
        return Ok(());
    }

    info!(
        interval_secs = config.gc.interval_secs,
        catalog_batch_size = config.gc.catalog_batch_size,
        purge = config.gc.purge,
        "recordlog-gc started"
    );

    let handle = GarbageCollector::new(store, catalog, config.gc.clone()).spawn();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping garbage collector");
    handle.abort();

    Ok(())
}
