//! Deplink Configuration System
//!
//! Provides the user-level configuration of the deplink tool:
//! - Global user configuration (~/.deplink/config.toml)
//! - Default repositories consulted after the project's own
//! - Package archive cache location
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults (remote repository, ~/.deplink/cache)
//! 2. Global config (~/.deplink/config.toml)
//! 3. Environment variables (DEPLINK_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use deplink_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load().unwrap();
//! println!("cache: {}", config.cache_dir.display());
//! ```

pub mod global;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading ~/.deplink/config.toml
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Cannot read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed config file {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Config value '{field}' is invalid: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cannot locate the user home directory, set DEPLINK_HOME")]
    HomeNotFound,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub use global::{GlobalConfig, RepositoryConfig, DEFAULT_REPOSITORY_URL};
pub use loader::{Config, ConfigLoader};
