//! Error types for the leaderboard bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Could not open the connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Engine.IO / Socket.IO handshake did not complete
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Malformed or unexpected packet
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Player name already present on the leaderboard
    #[error("Name already present: {0}")]
    NameTaken(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::SerializationError(err.to_string())
    }
}
