//! Error types for pulsetrack-core

use thiserror::Error;

/// Main error type for the pulsetrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Delivery error (transport failure or non-2xx collector response)
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Event source error
    #[error("event source error: {0}")]
    Source(String),
}

/// Result type alias for pulsetrack-core
pub type Result<T> = std::result::Result<T, Error>;
