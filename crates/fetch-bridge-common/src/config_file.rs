//! Configuration file structures.
//!
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`LoggingConfig`]: Log filter and output format
//! - [`ServeConfig`]: Development stub server settings

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::BridgeConfig;

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [bridge.pool]
/// max_idle_per_host = 4
/// connect_timeout_ms = 2_000
///
/// [bridge.stream]
/// channel_capacity = 32
///
/// [logging]
/// filter = "info,fetch_bridge_host=debug"
/// json = false
///
/// [server]
/// bind_addr = "127.0.0.1:8787"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Bridge configuration.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Stub server configuration.
    #[serde(default)]
    pub server: ServeConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "defaults::log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: defaults::log_filter(),
            json: false,
        }
    }
}

/// Stub server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServeConfig {
    /// Bind address (e.g., "127.0.0.1:8787").
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn log_filter() -> String {
        "info,edge_fetch_bridge=debug,fetch_bridge_core=debug,fetch_bridge_host=debug".to_string()
    }

    pub fn bind_addr() -> String {
        "127.0.0.1:8787".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();

        assert_eq!(config.bridge.pool.max_idle_per_host, 10);
        assert!(config.logging.filter.starts_with("info"));
        assert!(!config.logging.json);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8787");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [bridge.pool]
            max_idle_per_host = 4
            connect_timeout_ms = 2_000
            user_agent = "test-agent"

            [bridge.stream]
            channel_capacity = 32

            [logging]
            filter = "warn"
            json = true

            [server]
            bind_addr = "0.0.0.0:9000"
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(config.bridge.pool.max_idle_per_host, 4);
        assert_eq!(config.bridge.pool.connect_timeout_ms, 2_000);
        assert_eq!(config.bridge.pool.user_agent, "test-agent");
        // Defaults applied
        assert_eq!(config.bridge.pool.idle_timeout_secs, 90);
        assert_eq!(config.bridge.stream.channel_capacity, 32);
        assert_eq!(config.logging.filter, "warn");
        assert!(config.logging.json);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let invalid = "this is not valid toml [";
        assert!(matches!(
            ConfigFile::from_toml(invalid),
            Err(ConfigFileError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::from_file("/nonexistent/bridge.toml");
        assert!(matches!(result, Err(ConfigFileError::Io { .. })));
    }
}
