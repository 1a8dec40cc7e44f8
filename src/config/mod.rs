//! Configuration management for tubefetch
//!
//! Settings are layered:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use tubefetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `TUBEFETCH__<section>__<key>`:
//! - `TUBEFETCH__SERVER__BIND_ADDR=127.0.0.1:8000`
//! - `TUBEFETCH__PROVIDER__BINARY=/usr/local/bin/yt-dlp`
//! - `TUBEFETCH__JOBS__MAX_CONCURRENT=4`
//!
//! # Configuration File
//!
//! Read from `config/tubefetch.toml` unless `TUBEFETCH_CONFIG` points
//! elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{ApiLimits, Config, JobsConfig, ProviderConfig, ServerConfig, TelemetryConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path (plus environment overrides)
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// [`Config::load_from_path`] when a path is given, [`Config::load`] otherwise
    pub fn load_with_override(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let _ = dotenvy::dotenv();
                Self::load_from_path(path)
            }
            None => Self::load(),
        }
    }
}
