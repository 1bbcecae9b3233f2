//! hangman client - terminal front end
//!
//! Reads player commands from stdin, sends them through the connection
//! handler, and prints every game-state update the server pushes back.

use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

use hangman_client::commands::{parse_command, Command, ParseError, HELP};
use hangman_client::{ClientConfig, ConnectionHandler, DisconnectReason, GameObserver};
use hangman_protocol::Response;
use hangman_utils::{init_logging_with_config, HangmanError, LogConfig, Result};

mod cli;

use cli::Args;

/// How long to wait for the server to acknowledge QUIT by closing
const QUIT_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle events forwarded from the observer to the input loop
enum Lifecycle {
    Connected,
    Disconnected(DisconnectReason),
}

/// Prints game state and forwards lifecycle events to the main thread
struct TerminalObserver {
    lifecycle: mpsc::Sender<Lifecycle>,
}

impl GameObserver for TerminalObserver {
    fn on_game_change(&mut self, response: Response) {
        println!("{}", render_state(&response));
    }

    fn on_connected(&mut self) {
        let _ = self.lifecycle.send(Lifecycle::Connected);
    }

    fn on_disconnected(&mut self, reason: DisconnectReason) {
        let _ = self.lifecycle.send(Lifecycle::Disconnected(reason));
    }
}

fn render_state(state: &Response) -> String {
    format!(
        "[{}] {}   attempts left: {}   score: {}",
        state.status, state.word, state.remaining_attempts, state.score
    )
}

fn main() -> Result<()> {
    let args = Args::parse_args();

    let log_config = if args.verbose {
        LogConfig::development()
    } else {
        LogConfig::client()
    };
    init_logging_with_config(log_config)?;
    tracing::info!("hangman client starting");
    tracing::debug!("CLI args: {:?}", args);

    match run(args) {
        Ok(()) => {
            tracing::info!("hangman client exiting normally");
            Ok(())
        }
        Err(e) => {
            tracing::error!("hangman client error: {}", e);
            eprintln!("Error: {}", e);
            Err(e)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_or_default(),
    };
    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    let (lifecycle_tx, lifecycle_rx) = mpsc::channel();
    let handler = ConnectionHandler::with_config(
        TerminalObserver {
            lifecycle: lifecycle_tx,
        },
        config.connection,
    )?;

    handler.connect(&host, port)?;
    match lifecycle_rx.recv() {
        Ok(Lifecycle::Connected) => println!("connected to {}:{}", host, port),
        Ok(Lifecycle::Disconnected(DisconnectReason::Error(e))) => return Err(e),
        Ok(Lifecycle::Disconnected(reason)) => {
            return Err(HangmanError::connection(reason.to_string()));
        }
        Err(_) => return Err(HangmanError::internal("observer went away")),
    }
    println!("{}", HELP);

    for line in std::io::stdin().lock().lines() {
        let line = line?;

        match parse_command(&line) {
            Ok(Command::Help) => println!("{}", HELP),
            Ok(command) => {
                if let Err(e) = command.apply(&handler) {
                    eprintln!("{}", e);
                }
                if command == Command::Quit {
                    break;
                }
            }
            Err(ParseError::Empty) => {}
            Err(e) => eprintln!("{}", e),
        }

        if handler.state().is_terminal() {
            break;
        }
    }

    // Let the loop flush QUIT and report how the connection ended
    match lifecycle_rx.recv_timeout(QUIT_GRACE) {
        Ok(Lifecycle::Disconnected(reason)) if reason.is_error() => {
            println!("connection lost: {}", reason);
        }
        Ok(Lifecycle::Disconnected(_)) => println!("bye"),
        Ok(Lifecycle::Connected) | Err(_) => {
            tracing::debug!("No disconnect notification before exit");
        }
    }
    Ok(())
}
