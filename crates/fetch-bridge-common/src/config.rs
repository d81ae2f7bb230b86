//! Configuration structures for the fetch bridge.
//!
//! - [`BridgeConfig`]: Top-level configuration for one bridge instance
//! - [`PoolConfig`]: Settings for the pooled HTTP client
//! - [`StreamConfig`]: Settings for streamed response bodies

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Pooled client configuration.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Streamed body configuration.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Pooled HTTP client configuration.
///
/// A client is built per destination authority and reused until the
/// authority changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Maximum idle connections kept for the authority.
    #[serde(default = "defaults::max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// How long an idle connection is kept, in seconds.
    #[serde(default = "defaults::idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// TCP connect timeout in milliseconds.
    ///
    /// This bounds connection setup only. Once a request is sent the caller
    /// waits for the response without a deadline.
    #[serde(default = "defaults::connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// `User-Agent` sent on bridged requests.
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: defaults::max_idle_per_host(),
            idle_timeout_secs: defaults::idle_timeout_secs(),
            connect_timeout_ms: defaults::connect_timeout_ms(),
            user_agent: defaults::user_agent(),
        }
    }
}

impl PoolConfig {
    /// Get the idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get the connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Streamed body configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Chunks buffered between the background pump and the caller.
    ///
    /// The pump pauses when the caller falls this far behind.
    #[serde(default = "defaults::channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: defaults::channel_capacity(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn max_idle_per_host() -> usize {
        10
    }

    pub const fn idle_timeout_secs() -> u64 {
        90
    }

    pub const fn connect_timeout_ms() -> u64 {
        10_000
    }

    pub fn user_agent() -> String {
        concat!("edge-fetch-bridge/", env!("CARGO_PKG_VERSION")).to_string()
    }

    pub const fn channel_capacity() -> usize {
        16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();

        assert_eq!(config.pool.max_idle_per_host, 10);
        assert_eq!(config.pool.idle_timeout_secs, 90);
        assert_eq!(config.pool.connect_timeout_ms, 10_000);
        assert!(config.pool.user_agent.starts_with("edge-fetch-bridge/"));
        assert_eq!(config.stream.channel_capacity, 16);
    }

    #[test]
    fn test_durations() {
        let pool = PoolConfig {
            idle_timeout_secs: 5,
            connect_timeout_ms: 250,
            ..Default::default()
        };

        assert_eq!(pool.idle_timeout(), Duration::from_secs(5));
        assert_eq!(pool.connect_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"pool": {"max_idle_per_host": 2}}"#;
        let config: BridgeConfig = serde_json::from_str(json).unwrap();

        // Explicitly set value
        assert_eq!(config.pool.max_idle_per_host, 2);
        // Default values for unspecified fields
        assert_eq!(config.pool.connect_timeout_ms, 10_000);
        assert_eq!(config.stream.channel_capacity, 16);
    }
}
