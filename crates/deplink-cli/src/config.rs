//! CLI configuration via environment variables
//!
//! Settings shared by every command. Anything persistent lives in
//! `~/.deplink/config.toml` and is handled by `deplink-config`.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (DEPLINK_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Hide download progress bars (DEPLINK_NO_PROGRESS=1)
    pub no_progress: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var_os("DEPLINK_NO_COLOR").is_some() || env::var_os("NO_COLOR").is_some(),
            no_progress: env::var("DEPLINK_NO_PROGRESS")
                .map(|v| {
                    let lower = v.to_lowercase();
                    !(lower.is_empty() || lower == "0" || lower == "false" || lower == "off")
                })
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::remove_var("DEPLINK_NO_COLOR");
        env::remove_var("NO_COLOR");
        env::set_var("DEPLINK_NO_PROGRESS", "off");

        let config = Config::from_env();
        assert!(!config.no_color);
        assert!(!config.no_progress);

        env::set_var("NO_COLOR", "1");
        env::set_var("DEPLINK_NO_PROGRESS", "1");

        let config = Config::from_env();
        assert!(config.no_color);
        assert!(config.no_progress);

        env::remove_var("NO_COLOR");
        env::remove_var("DEPLINK_NO_PROGRESS");
    }
}
