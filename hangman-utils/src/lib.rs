//! hangman-utils: Common utilities shared across hangman crates
//!
//! This crate provides:
//! - Unified error types ([`HangmanError`], [`Result`])
//! - Logging infrastructure ([`init_logging_with_config`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{HangmanError, Result};
pub use logging::{init_logging_with_config, LogConfig, LogOutput};
pub use paths::{config_dir, config_file, log_dir, state_dir};
