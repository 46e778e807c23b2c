//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::{GlobalConfig, RepositoryConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the deplink home directory (~/.deplink)
pub const ENV_HOME: &str = "DEPLINK_HOME";

/// Overrides the archive cache directory
pub const ENV_CACHE_DIR: &str = "DEPLINK_CACHE_DIR";

/// Drops the built-in default repository when set to a true value
pub const ENV_NO_DEFAULT_REPOSITORY: &str = "DEPLINK_NO_DEFAULT_REPOSITORY";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Global config (~/.deplink/config.toml) - overrides defaults
/// 3. Environment variables (DEPLINK_*) - overrides global
/// 4. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Explicit home directory, bypassing DEPLINK_HOME and ~/.deplink
    home: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Global configuration as read from disk
    pub global: GlobalConfig,

    /// Deplink home directory
    pub home: PathBuf,

    /// Effective archive cache directory
    pub cache_dir: PathBuf,

    /// Effective default repositories
    pub repositories: Vec<RepositoryConfig>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { home: None }
    }

    /// Loader reading its files from the given home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    /// Load the global configuration and apply environment overrides
    pub fn load(&self) -> ConfigResult<Config> {
        let home = self.home_dir()?;
        let global = Self::load_global_config(&home.join("config.toml"))?;
        Ok(self.apply_env_overrides(Config::resolve(global, home)))
    }

    /// Deplink home directory: explicit, then DEPLINK_HOME, then ~/.deplink
    pub fn home_dir(&self) -> ConfigResult<PathBuf> {
        if let Some(home) = &self.home {
            return Ok(home.clone());
        }

        if let Some(home) = env::var_os(ENV_HOME).filter(|h| !h.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".deplink"))
    }

    /// Ensure the home directory exists
    pub fn ensure_home_dir(&self) -> ConfigResult<PathBuf> {
        let dir = self.home_dir()?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Global configuration is optional - if it doesn't exist, return default
    fn load_global_config(path: &Path) -> ConfigResult<GlobalConfig> {
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(path)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, mut config: Config) -> Config {
        if let Some(cache) = env::var_os(ENV_CACHE_DIR).filter(|c| !c.is_empty()) {
            config.cache_dir = PathBuf::from(cache);
        }

        if let Ok(value) = env::var(ENV_NO_DEFAULT_REPOSITORY) {
            if is_truthy(&value) && config.global.repositories.is_none() {
                config.repositories.clear();
            }
        }

        config
    }
}

impl Config {
    /// Fill in the built-in defaults missing from the global configuration
    pub fn resolve(global: GlobalConfig, home: PathBuf) -> Self {
        let cache_dir = match global.cache_dir() {
            Some(dir) => home.join(dir),
            None => home.join("cache"),
        };

        let repositories = global
            .repositories
            .clone()
            .unwrap_or_else(|| vec![RepositoryConfig::default_remote()]);

        Self {
            global,
            home,
            cache_dir,
            repositories,
        }
    }

    /// Whether progress bars are shown
    pub fn show_progress(&self) -> bool {
        self.global.show_progress()
    }

    /// Whether dev-dependencies are installed by default
    pub fn install_dev(&self) -> bool {
        self.global.install_dev()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
