//! Public connection handle
//!
//! [`ConnectionHandler`] is what game code holds. Its methods never touch
//! the socket: they check the connection state, push a request onto the
//! outbound queue and wake the I/O loop, all without blocking.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use hangman_protocol::{ClientCodec, Request};
use hangman_utils::{HangmanError, Result};
use parking_lot::Mutex;
use tokio::net::TcpSocket;

use super::dispatch::Dispatcher;
use super::event_loop::{EventLoop, Shared};
use super::handler::GameObserver;
use super::state::ConnectionState;
use crate::config::ConnectionConfig;

/// Client connection to a hangman server
///
/// Safe to share between threads (e.g. behind an `Arc`). One handler drives
/// at most one connection; once it reaches [`ConnectionState::Closed`] it
/// stays there, and a new handler is needed to play again.
pub struct ConnectionHandler {
    shared: Arc<Shared>,
    /// Taken by `connect` and moved onto the dispatch thread
    observer: Mutex<Option<Box<dyn GameObserver>>>,
    config: ConnectionConfig,
    codec: ClientCodec,
    io_thread: Mutex<Option<JoinHandle<()>>>,
    dispatch_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHandler {
    /// Create a handler (not yet connected) reporting to `observer`
    pub fn new(observer: impl GameObserver + 'static) -> Self {
        Self::build(Box::new(observer), ConnectionConfig::default())
    }

    /// Create a handler with custom transport settings
    ///
    /// Fails with [`HangmanError::Config`] if `config` does not pass
    /// [`ConnectionConfig::validate`].
    pub fn with_config(
        observer: impl GameObserver + 'static,
        config: ConnectionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Box::new(observer), config))
    }

    fn build(observer: Box<dyn GameObserver>, config: ConnectionConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            observer: Mutex::new(Some(observer)),
            codec: ClientCodec::with_max_frame_size(config.max_frame_size),
            config,
            io_thread: Mutex::new(None),
            dispatch_thread: Mutex::new(None),
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state.current()
    }

    /// Start connecting to `host:port`
    ///
    /// Resolves the address and sets up the socket on the calling thread,
    /// then returns while the handshake is still in flight. Completion is
    /// reported through [`GameObserver::on_connected`]; a failed handshake
    /// through [`GameObserver::on_disconnected`].
    pub fn connect(&self, host: &str, port: u16) -> Result<()> {
        self.shared
            .state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
            .map_err(|_| HangmanError::AlreadyConnected)?;

        if let Err(e) = self.start(host, port) {
            tracing::error!(host, port, error = %e, "Failed to start connection");
            if self.observer.lock().is_some() {
                let _ = self
                    .shared
                    .state
                    .transition(ConnectionState::Connecting, ConnectionState::Disconnected);
            } else {
                // Observer already handed off; this handler can't be reused
                self.shared.state.close();
            }
            return Err(e);
        }
        Ok(())
    }

    fn start(&self, host: &str, port: u16) -> Result<()> {
        let addr = resolve(host, port)?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(|e| HangmanError::connection(format!("Failed to create socket: {}", e)))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(|e| HangmanError::connection(format!("Failed to create reactor: {}", e)))?;

        let observer = self
            .observer
            .lock()
            .take()
            .ok_or_else(|| HangmanError::internal("Observer already attached"))?;
        let (dispatcher, dispatch_thread) = Dispatcher::spawn(observer)?;
        *self.dispatch_thread.lock() = Some(dispatch_thread);

        let event_loop = EventLoop::new(self.shared.clone(), dispatcher, &self.config);
        let handle = std::thread::Builder::new()
            .name("hangman-io".into())
            .spawn(move || runtime.block_on(event_loop.run(socket, addr)))
            .map_err(|e| HangmanError::internal(format!("Failed to spawn I/O thread: {}", e)))?;
        *self.io_thread.lock() = Some(handle);

        tracing::info!(host, %addr, "Connecting to server");
        Ok(())
    }

    /// Request the server to set up a new game
    pub fn new_game(&self) -> Result<()> {
        self.send(Request::NewGame)
    }

    /// Guess a single letter
    pub fn send_letter_to_guess(&self, letter: char) -> Result<()> {
        self.send(Request::guess_letter(letter))
    }

    /// Guess the whole word
    pub fn send_word_to_guess(&self, word: &str) -> Result<()> {
        self.send(Request::guess_word(word))
    }

    /// Tell the server we are leaving
    ///
    /// Queues QUIT and moves to `Closing`; the loop closes the socket once
    /// QUIT is on the wire. Nothing can be sent afterwards.
    pub fn quit_game(&self) -> Result<()> {
        let state = &self.shared.state;
        self.shared.queue.push_if(Request::Quit, || {
            state
                .transition(ConnectionState::Connected, ConnectionState::Closing)
                .map_err(|_| HangmanError::NotConnected)
        })
    }

    fn send(&self, request: Request) -> Result<()> {
        self.codec.check_size(&request)?;

        let state = &self.shared.state;
        self.shared.queue.push_if(request, || {
            if state.current().accepts_requests() {
                Ok(())
            } else {
                Err(HangmanError::NotConnected)
            }
        })
    }

    /// Close the connection now, dropping anything not yet sent
    ///
    /// Idempotent, and a no-op before `connect`.
    pub fn disconnect(&self) {
        let state = self.state();
        if state == ConnectionState::Disconnected || state.is_terminal() {
            return;
        }
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            tracing::debug!(%state, "Disconnect requested");
            self.shared.queue.wake();
        }
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.disconnect();
        if let Some(handle) = self.io_thread.lock().take() {
            if handle.join().is_err() {
                tracing::error!("I/O thread panicked");
            }
        }
        // The observer may own the last reference and drop us from a callback
        if let Some(handle) = self.dispatch_thread.lock().take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Observer dispatch thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("state", &self.state())
            .field("queued", &self.shared.queue.len())
            .field("config", &self.config)
            .finish()
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| HangmanError::connection(format!("Failed to resolve {}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| HangmanError::connection(format!("No address found for {}:{}", host, port)))
}
