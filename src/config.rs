//! Configuration loading and validation.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};

/// Main configuration for the reflector.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Network interface to capture on and reflect into (e.g. "br0").
    pub interface: String,

    /// Capacity of the queue between the decode pipeline and the reflector.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Number of pre-allocated frame buffers used for re-serialization.
    #[serde(default = "default_buffer_pool_size")]
    pub buffer_pool_size: usize,

    /// Live capture settings.
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings passed to the capture handle when it is opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureSettings {
    /// Maximum number of bytes captured per frame.
    #[serde(default = "default_snap_len")]
    pub snap_len: i32,

    /// Put the interface in promiscuous mode.
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Read timeout in milliseconds. Bounds how long a shutdown request can go unnoticed.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: i32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            snap_len: default_snap_len(),
            promiscuous: default_promiscuous(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Expose a `/metrics` endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter listens on. Local only by default.
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_channel_capacity() -> usize {
    100
}

const fn default_buffer_pool_size() -> usize {
    64
}

const fn default_snap_len() -> i32 {
    65536
}

const fn default_promiscuous() -> bool {
    true
}

const fn default_read_timeout_ms() -> i32 {
    1000
}

const fn default_metrics_listen() -> SocketAddr {
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 9100)
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.interface.trim().is_empty() {
            return Err(ValidationError::EmptyInterface);
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::ZeroChannelCapacity);
        }
        if self.buffer_pool_size == 0 {
            return Err(ValidationError::ZeroBufferPoolSize);
        }
        if self.capture.snap_len <= 0 {
            return Err(ValidationError::InvalidSnapLen);
        }
        if self.capture.read_timeout_ms <= 0 {
            return Err(ValidationError::InvalidReadTimeout);
        }
        Ok(())
    }
}
