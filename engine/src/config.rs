//! Configuration management for the poultry ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with POULTRY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use shared::types::MissingReferencePolicy;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub storage: StorageConfig,

    pub import: ImportConfig,

    pub analytics: AnalyticsConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// JSON snapshot file holding every collection
    pub data_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// What to do with rows naming an unknown cycle or cage
    pub missing_reference_policy: MissingReferencePolicy,

    /// Capacity given to cages created by an import
    pub default_cage_capacity: u32,

    /// Breed given to cages created by an import
    pub default_breed: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Default report window in days
    pub date_range_days: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("POULTRY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("storage.data_file", "data/poultry-ledger.json")?
            .set_default("import.missing_reference_policy", "auto_create")?
            .set_default("import.default_cage_capacity", 500)?
            .set_default("import.default_breed", "Mixed")?
            .set_default("analytics.date_range_days", 30)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (POULTRY_ prefix)
            .add_source(
                Environment::with_prefix("POULTRY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            missing_reference_policy: MissingReferencePolicy::AutoCreate,
            default_cage_capacity: 500,
            default_breed: "Mixed".to_string(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { date_range_days: 30 }
    }
}
