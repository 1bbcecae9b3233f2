//! Error types for hangman
//!
//! Provides a unified error type used across all hangman crates.

use std::path::PathBuf;

use hangman_protocol::CodecError;

/// Main error type for hangman operations
#[derive(Debug, thiserror::Error)]
pub enum HangmanError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Connection Errors ===

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Not connected to server")]
    NotConnected,

    #[error("Connection already started")]
    AlreadyConnected,

    #[error("Server closed the connection")]
    PeerClosed,

    // === Protocol Errors ===

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HangmanError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error ends the connection it occurred on
    ///
    /// Fatal errors are raised by the I/O loop; the connection is closed and
    /// never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PeerClosed | Self::Io(_) | Self::Codec(_) | Self::Connection(_)
        )
    }
}

/// Result type alias using HangmanError
pub type Result<T> = std::result::Result<T, HangmanError>;
