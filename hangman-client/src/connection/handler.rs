//! Observer trait for game-state notifications

use hangman_protocol::Response;
use hangman_utils::HangmanError;

/// Why a connection ended
#[derive(Debug)]
pub enum DisconnectReason {
    /// QUIT was flushed and the client closed its side
    Quit,
    /// `disconnect` was called or the handler was dropped
    Requested,
    /// The I/O loop hit a fatal error (peer close, I/O fault, bad frame,
    /// failed handshake)
    Error(HangmanError),
}

impl DisconnectReason {
    /// Whether the server closed the connection on us
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, Self::Error(HangmanError::PeerClosed))
    }

    /// Whether the connection ended because of a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Requested => write!(f, "disconnect requested"),
            Self::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Receiver of everything the server tells the client
///
/// All methods run on the dispatch thread, one at a time, in the order the
/// events were produced by the I/O loop.
pub trait GameObserver: Send {
    /// Handle a decoded game-state update
    fn on_game_change(&mut self, response: Response);

    /// Called when the TCP handshake completes
    fn on_connected(&mut self) {}

    /// Called exactly once when the connection ends
    fn on_disconnected(&mut self, _reason: DisconnectReason) {}
}

/// Simple callback-based observer
pub struct CallbackObserver<F>
where
    F: FnMut(Response) + Send,
{
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: FnMut(Response) + Send,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> GameObserver for CallbackObserver<F>
where
    F: FnMut(Response) + Send,
{
    fn on_game_change(&mut self, response: Response) {
        (self.callback)(response);
    }
}
