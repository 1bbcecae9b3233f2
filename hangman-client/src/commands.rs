//! Player command parsing
//!
//! Turns a line typed by the player into a [`Command`] and applies it to a
//! [`ConnectionHandler`].

use hangman_utils::Result;

use crate::connection::ConnectionHandler;

/// Parsed player command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new game
    NewGame,
    /// Guess one letter
    Letter(char),
    /// Guess the whole word
    Word(String),
    /// Leave the game and close the connection
    Quit,
    /// Show the command list
    Help,
}

/// Error parsing a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("missing argument for '{0}'")]
    MissingArgument(&'static str),
    #[error("'letter' takes exactly one character, got '{0}'")]
    NotALetter(String),
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
}

/// Help text listing every command
pub const HELP: &str = "\
commands:
  new            start a new game
  letter <c>     guess a letter (or just type the letter)
  word <w>       guess the whole word
  quit           leave the game
  help           show this list";

/// Parse a command line
///
/// # Examples
///
/// ```
/// use hangman_client::commands::{parse_command, Command};
///
/// assert_eq!(parse_command("letter e").unwrap(), Command::Letter('e'));
/// assert_eq!(parse_command("e").unwrap(), Command::Letter('e'));
/// assert_eq!(parse_command("word tree").unwrap(), Command::Word("tree".into()));
/// ```
pub fn parse_command(input: &str) -> std::result::Result<Command, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let (name, arg) = match input.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (input, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "new" => Ok(Command::NewGame),
        "quit" | "exit" => Ok(Command::Quit),
        "help" | "?" => Ok(Command::Help),
        "letter" => parse_letter(arg),
        "word" => {
            if arg.is_empty() {
                Err(ParseError::MissingArgument("word"))
            } else {
                Ok(Command::Word(arg.to_string()))
            }
        }
        _ if arg.is_empty() && name.chars().count() == 1 => parse_letter(name),
        _ => Err(ParseError::Unknown(name.to_string())),
    }
}

fn parse_letter(arg: &str) -> std::result::Result<Command, ParseError> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(ParseError::MissingArgument("letter")),
        (Some(letter), None) => Ok(Command::Letter(letter)),
        (Some(_), Some(_)) => Err(ParseError::NotALetter(arg.to_string())),
    }
}

impl Command {
    /// Send this command over `connection`
    ///
    /// `Help` has nothing to send and is a no-op.
    pub fn apply(&self, connection: &ConnectionHandler) -> Result<()> {
        match self {
            Command::NewGame => connection.new_game(),
            Command::Letter(letter) => connection.send_letter_to_guess(*letter),
            Command::Word(word) => connection.send_word_to_guess(word),
            Command::Quit => connection.quit_game(),
            Command::Help => Ok(()),
        }
    }
}
