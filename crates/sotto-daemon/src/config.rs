//! Daemon configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use sotto_ipc::DEFAULT_BIND_ADDR;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the line protocol server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// How long a cached setting is trusted, in milliseconds
    #[serde(default = "default_stale_limit_ms")]
    pub stale_limit_ms: u64,
    /// Interval between device polls, in milliseconds
    #[serde(default = "default_monitor_period_ms")]
    pub monitor_period_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            stale_limit_ms: default_stale_limit_ms(),
            monitor_period_ms: default_monitor_period_ms(),
        }
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_stale_limit_ms() -> u64 {
    1000
}

fn default_monitor_period_ms() -> u64 {
    2000
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Database path (optional, uses default if not set)
    pub path: Option<PathBuf>,
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?;
        Ok(config)
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("io", "sotto", "Sotto").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.daemon.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.daemon.stale_limit_ms, 1000);
        assert_eq!(config.daemon.monitor_period_ms, 2000);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            bind_addr = "0.0.0.0:9000"

            [database]
            path = "/tmp/sotto-test.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.daemon.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.daemon.stale_limit_ms, 1000);
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/sotto-test.db")));
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind_addr, DEFAULT_BIND_ADDR);
    }
}
