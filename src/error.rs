//! Error types for the mDNS reflector.

use std::io;

use thiserror::Error;

/// Main error type for reflector operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("interface cannot be empty")]
    EmptyInterface,

    #[error("channel_capacity must be greater than 0")]
    ZeroChannelCapacity,

    #[error("buffer_pool_size must be greater than 0")]
    ZeroBufferPoolSize,

    #[error("capture.snap_len must be greater than 0")]
    InvalidSnapLen,

    #[error("capture.read_timeout_ms must be greater than 0")]
    InvalidReadTimeout,
}

/// Network-related errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("interface {name:?} is unavailable for live capture: {reason}")]
    InterfaceUnavailable { name: String, reason: String },

    #[error("interface {name:?} has no hardware address")]
    NoHardwareAddress { name: String },

    #[error("failed to compile capture filter {filter:?}: {reason}")]
    FilterCompile { filter: String, reason: String },

    #[error("no capture filter installed before reading")]
    FilterMissing,

    #[error("capture read failed: {0}")]
    Capture(String),

    #[error("capture source closed")]
    CaptureClosed,

    #[error("failed to write frame: {0}")]
    Write(String),

    #[error("failed to serialize frame: {0}")]
    Serialization(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
