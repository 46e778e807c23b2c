//! Global Configuration (~/.deplink/config.toml)
//!
//! Handles user-level configuration stored in `~/.deplink/config.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository used when the configuration declares none
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo.deplink.org";

/// Global user configuration from ~/.deplink/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Package archive cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Repositories consulted after the ones a project declares
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<RepositoryConfig>>,

    /// Install command defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallConfig>,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache directory, relative paths are resolved against ~/.deplink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Repository declaration, same shape as in deplink.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// "local" or "remote"
    #[serde(rename = "type")]
    pub kind: String,

    /// Directory or base URL
    pub src: String,
}

/// Install command defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    /// Show download progress bars (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<bool>,

    /// Install dev-dependencies of the project (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev: Option<bool>,
}

impl RepositoryConfig {
    pub fn new(kind: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            src: src.into(),
        }
    }

    /// The public remote repository
    pub fn default_remote() -> Self {
        Self::new("remote", DEFAULT_REPOSITORY_URL)
    }
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        for (index, repository) in self.repositories.iter().flatten().enumerate() {
            if !matches!(repository.kind.as_str(), "local" | "remote") {
                return Err(ConfigError::InvalidValue {
                    field: format!("repositories[{}].type", index),
                    reason: format!("must be 'local' or 'remote', got '{}'", repository.kind),
                });
            }
            if repository.src.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("repositories[{}].src", index),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        if let Some(dir) = self.cache.as_ref().and_then(|c| c.dir.as_ref()) {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "cache.dir".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the global config file path (~/.deplink/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".deplink").join("config.toml"))
    }

    /// Configured cache directory, if any
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache.as_ref().and_then(|c| c.dir.as_deref())
    }

    /// Whether progress bars are shown (default: true)
    pub fn show_progress(&self) -> bool {
        self.install
            .as_ref()
            .and_then(|i| i.progress)
            .unwrap_or(true)
    }

    /// Whether dev-dependencies are installed (default: true)
    pub fn install_dev(&self) -> bool {
        self.install.as_ref().and_then(|i| i.dev).unwrap_or(true)
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.cache.is_some() {
            self.cache = other.cache.clone();
        }
        if other.repositories.is_some() {
            self.repositories = other.repositories.clone();
        }
        if other.install.is_some() {
            self.install = other.install.clone();
        }
    }
}
