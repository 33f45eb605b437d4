//! semnet configuration
//!
//! Settings for the request loader, the HTTP transport and sync passes,
//! stored as TOML. Each section implements [`ConfigSection`] so it can be
//! validated and merged on its own.
//!
//! # Example
//!
//! ```rust,no_run
//! use semnet_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Loader concurrency: {}", config.loader.max_concurrent);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod loader_config;
mod sync_config;
mod transport_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{ConfigManager, ENV_PREFIX};
pub use validation::{ConfigSection, Validator};

pub use loader_config::LoaderConfig;
pub use sync_config::SyncConfig;
pub use transport_config::TransportConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Request loader settings
    pub loader: LoaderConfig,

    /// HTTP transport settings
    pub transport: TransportConfig,

    /// Tracked resource and sync defaults
    pub sync: SyncConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.loader.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.transport.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sync.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.loader.merge(other.loader);
        self.transport.merge(other.transport);
        self.sync.merge(other.sync);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            loader: LoaderConfig::default(),
            transport: TransportConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut override_config = Config::default();
        override_config.loader.max_concurrent = 2;

        base.merge(override_config);
        assert_eq!(base.loader.max_concurrent, 2);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[loader]\nmax_concurrent = 4\n").unwrap();
        assert_eq!(config.loader.max_concurrent, 4);
        assert_eq!(config.transport, TransportConfig::default());
        assert_eq!(config.version, CONFIG_VERSION);
    }
}
