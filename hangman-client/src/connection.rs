//! Client-server connection management
//!
//! Provides the TCP connection to a hangman server: a non-blocking I/O loop
//! on its own thread, a queue feeding it requests from any thread, and
//! asynchronous delivery of server updates to a [`GameObserver`].

mod client;
mod dispatch;
mod event_loop;
mod handler;
mod queue;
mod state;

pub use client::ConnectionHandler;
pub use handler::{CallbackObserver, DisconnectReason, GameObserver};
pub use state::ConnectionState;
