//! Error types for the storage bridge

use thiserror::Error;

/// Errors that can occur while loading, saving or launching
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No window, or the browser refused access to LocalStorage
    #[error("persistent storage is unavailable")]
    Unavailable,

    /// A storage read, write or remove call threw
    #[error("storage access failed: {0}")]
    Storage(String),

    /// The stored text is not a JSON array of data points
    #[error("stored data points are malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The payload could not be encoded as JSON
    #[error("failed to serialize data points: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The runtime emitted something other than an array of records
    #[error("expected an array of data points, got {0}")]
    NotAnArray(&'static str),

    /// The runtime failed to initialize or does not expose the port
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An app has already been booted on this page
    #[error("bridge is already running")]
    AlreadyRunning,

    /// The bridge configuration object is invalid
    #[error("invalid bridge config: {0}")]
    Config(#[source] serde_json::Error),
}

/// A specialized Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
