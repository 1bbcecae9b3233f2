//! Client-server message types

use serde::{Deserialize, Serialize};

/// Requests sent from client to server
///
/// The set is closed: every player action the client can take maps to
/// exactly one variant. A request is immutable once built and is consumed by
/// the codec when it goes on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Request {
    /// Ask the server to set up a new game
    NewGame,

    /// Guess a single letter
    GuessLetter(char),

    /// Guess the whole word
    GuessWord(String),

    /// Tell the server to end the session and close its side
    Quit,
}

/// Payload-free discriminant of a [`Request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    NewGame,
    GuessLetter,
    GuessWord,
    Quit,
}

impl Request {
    /// Build a letter guess
    pub fn guess_letter(letter: char) -> Self {
        Self::GuessLetter(letter)
    }

    /// Build a word guess
    pub fn guess_word(word: impl Into<String>) -> Self {
        Self::GuessWord(word.into())
    }

    /// Kind of this request
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::NewGame => RequestKind::NewGame,
            Self::GuessLetter(_) => RequestKind::GuessLetter,
            Self::GuessWord(_) => RequestKind::GuessWord,
            Self::Quit => RequestKind::Quit,
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestKind::NewGame => "NEW_GAME",
            RequestKind::GuessLetter => "GUESS_LETTER",
            RequestKind::GuessWord => "GUESS_WORD",
            RequestKind::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

/// Game state pushed from server to client
///
/// The client does not interpret this beyond handing it to the observer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    /// Server-defined status tag (e.g. "ready", "won", "lost")
    pub status: String,
    /// Word progress with unguessed letters masked
    pub word: String,
    /// Wrong guesses left before the round is lost
    pub remaining_attempts: u32,
    /// Running score for the session
    pub score: i32,
}

impl Response {
    /// Create a response carrying only a status
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }
}
