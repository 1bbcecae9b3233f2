//! hangman-client: network layer of the hangman game client
//!
//! Connects to a game server over TCP, sends player requests without
//! blocking the caller, and reports decoded game state to a
//! [`GameObserver`].
//!
//! ```no_run
//! use hangman_client::{CallbackObserver, ConnectionHandler};
//!
//! # fn main() -> hangman_utils::Result<()> {
//! let handler = ConnectionHandler::new(CallbackObserver::new(|state| {
//!     println!("{}: {}", state.status, state.word);
//! }));
//! handler.connect("localhost", 9000)?;
//! // ... once `on_connected` has fired:
//! handler.new_game()?;
//! handler.send_letter_to_guess('e')?;
//! handler.quit_game()?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod connection;

pub use config::{ClientConfig, ConnectionConfig, ServerConfig};
pub use connection::{
    CallbackObserver, ConnectionHandler, ConnectionState, DisconnectReason, GameObserver,
};
