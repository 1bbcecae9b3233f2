//! Client-side configuration loading
//!
//! Reads `~/.config/hangman/config.toml`. Every field has a default, so a
//! partial file or no file at all is fine.

use std::path::{Path, PathBuf};

use hangman_protocol::DEFAULT_MAX_FRAME_SIZE;
use hangman_utils::{HangmanError, Result};
use serde::Deserialize;

/// Default initial capacity of the receive buffer
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 4096;

/// Full client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
}

/// Where to connect when no address is given on the command line
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 9000,
        }
    }
}

/// Transport tuning for one connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Largest payload accepted in either direction, in bytes
    pub max_frame_size: usize,
    /// Initial receive buffer size; the buffer grows up to one full frame
    pub read_buffer_capacity: usize,
    /// Disable Nagle's algorithm on the socket
    pub nodelay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            nodelay: true,
        }
    }
}

impl ConnectionConfig {
    /// Check that these settings can drive a connection
    ///
    /// The frame limit must be positive and fit the 4-byte length prefix.
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(HangmanError::config("connection.max_frame_size must be positive"));
        }
        if self.max_frame_size > u32::MAX as usize {
            return Err(HangmanError::config(
                "connection.max_frame_size must fit in a 4-byte length prefix",
            ));
        }
        if self.read_buffer_capacity == 0 {
            return Err(HangmanError::config(
                "connection.read_buffer_capacity must be positive",
            ));
        }
        Ok(())
    }
}

impl ClientConfig {
    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load config from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HangmanError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_toml(&content).map_err(|e| HangmanError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.connection.validate().map_err(|e| match e {
            HangmanError::Config(message) => HangmanError::ConfigInvalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Load config from the default location
    ///
    /// Returns defaults if the file doesn't exist or can't be used.
    pub fn load_or_default() -> Self {
        let path = config_file();

        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!(
                    host = %config.server.host,
                    port = config.server.port,
                    max_frame_size = config.connection.max_frame_size,
                    "Loaded config from {}",
                    path.display()
                );
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }
}

/// Get the config file path (~/.config/hangman/config.toml)
pub fn config_file() -> PathBuf {
    hangman_utils::config_file()
}
