//! Command-line argument parsing for the hangman client
//!
//! Uses clap for argument parsing with derive macros.

use clap::Parser;
use std::path::PathBuf;

/// hangman - play a word-guessing game against a remote server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server host (overrides the config file)
    #[arg(long, env = "HANGMAN_HOST")]
    pub host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long, short = 'p', env = "HANGMAN_PORT")]
    pub port: Option<u16>,

    /// Path to a config file
    ///
    /// Defaults to ~/.config/hangman/config.toml. An explicit path must
    /// exist and parse; the default location silently falls back to
    /// built-in settings.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr instead of the log file
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
