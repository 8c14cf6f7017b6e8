//! recordlog configuration.
//!
//! One YAML document with a section per component (storage, limits, scout,
//! gc, catalog). `RECORDLOG__SECTION__KEY` variables override single values.

mod limits;

pub use limits::{
    LimitsConfig, DEFAULT_MAX_PULL_BATCH, DEFAULT_MAX_RECORDS_PER_PUSH, DEFAULT_MAX_RECORD_BYTES,
};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "RECORDLOG_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "RECORDLOG";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "RECORDLOG_LOG";

use serde::Deserialize;

use crate::catalog::CatalogConfig;
use crate::gc::GcConfig;
use crate::storage::StorageConfig;

/// Compaction scout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Threshold used when a scout request does not name one.
    pub default_min_compaction_size: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            default_min_compaction_size: 1,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Request limits.
    pub limits: LimitsConfig,
    /// Compaction scout defaults.
    pub scout: ScoutConfig,
    /// Garbage collector configuration.
    pub gc: GcConfig,
    /// Collection catalog client.
    pub catalog: CatalogConfig,
}

impl Config {
    /// Load configuration. Later sources override earlier ones:
    /// `config.yaml` if present, the `path` file, the `RECORDLOG_CONFIG`
    /// file, then `RECORDLOG__...` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory storage, default limits.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig {
                storage_type: crate::storage::StorageType::Memory,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }
}
