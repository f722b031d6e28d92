//! # Error Types
//!
//! Custom error types for the yoke controller using `thiserror`.

use thiserror::Error;

use crate::sensor::bus::BusError;

/// Main error type for the yoke controller
#[derive(Debug, Error)]
pub enum YokeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Two-wire bus errors
    #[error("Sensor bus error: {0}")]
    Bus(#[from] BusError),

    /// Serial link errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No usable serial device was found
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Parameter storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// The control queue has no consumer any more
    #[error("Control queue closed")]
    QueueClosed,

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the yoke controller
pub type Result<T> = std::result::Result<T, YokeError>;
