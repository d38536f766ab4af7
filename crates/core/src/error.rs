//! Error types for relaystream-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("No access token available")]
    AuthMissing,

    #[error("Session {0} is not registered with the relay")]
    SessionNotRegistered(String),

    #[error("Session roster query failed: {0}")]
    Roster(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Terminal surface error: {0}")]
    Surface(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Message encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StreamError>;

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Roster(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}
