//! Observer dispatch
//!
//! Runs the observer on its own thread so slow game logic never stalls the
//! I/O loop. Events cross over an unbounded channel, which keeps them in the
//! order the loop produced them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use hangman_protocol::Response;
use hangman_utils::{HangmanError, Result};
use tokio::sync::mpsc;

use super::handler::{DisconnectReason, GameObserver};

/// Something the observer needs to hear about
#[derive(Debug)]
pub(crate) enum ObserverEvent {
    Connected,
    GameChanged(Response),
    Disconnected(DisconnectReason),
}

/// Undelivered events at which a slow observer gets logged
const BACKLOG_WARN: usize = 1024;

/// Sending half of the dispatch thread, owned by the I/O loop
#[derive(Debug)]
pub(crate) struct Dispatcher {
    // Unbounded so the loop never waits on the observer; `backlog` makes a
    // stalled observer visible instead.
    tx: mpsc::UnboundedSender<ObserverEvent>,
    backlog: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Move `observer` onto a new dispatch thread
    pub(crate) fn spawn(observer: Box<dyn GameObserver>) -> Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));

        let pending = backlog.clone();
        let handle = std::thread::Builder::new()
            .name("hangman-dispatch".into())
            .spawn(move || dispatch_loop(observer, rx, pending))
            .map_err(|e| HangmanError::internal(format!("Failed to spawn dispatch thread: {}", e)))?;

        Ok((Self { tx, backlog }, handle))
    }

    /// Queue an event for the observer without waiting for it to run
    pub(crate) fn send(&self, event: ObserverEvent) {
        let depth = self.backlog.fetch_add(1, Ordering::AcqRel) + 1;
        if self.tx.send(event).is_err() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            // Only happens if the observer panicked and took the thread down
            tracing::warn!("Observer dispatch thread is gone, dropping event");
            return;
        }
        if depth % BACKLOG_WARN == 0 {
            tracing::warn!(depth, "Observer is falling behind");
        }
    }

    /// Events sent but not yet taken by the dispatch thread
    pub(crate) fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }
}

fn dispatch_loop(
    mut observer: Box<dyn GameObserver>,
    mut rx: mpsc::UnboundedReceiver<ObserverEvent>,
    backlog: Arc<AtomicUsize>,
) {
    while let Some(event) = rx.blocking_recv() {
        backlog.fetch_sub(1, Ordering::AcqRel);
        match event {
            ObserverEvent::Connected => observer.on_connected(),
            ObserverEvent::GameChanged(response) => observer.on_game_change(response),
            ObserverEvent::Disconnected(reason) => {
                observer.on_disconnected(reason);
                break;
            }
        }
    }
    tracing::debug!("Observer dispatch finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl GameObserver for Recorder {
        fn on_game_change(&mut self, response: Response) {
            self.log.lock().unwrap().push(response.status);
        }

        fn on_connected(&mut self) {
            self.log.lock().unwrap().push("connected".into());
        }

        fn on_disconnected(&mut self, reason: DisconnectReason) {
            self.log.lock().unwrap().push(format!("disconnected: {}", reason));
        }
    }

    #[test]
    fn test_events_delivered_in_order() {
        let recorder = Recorder::default();
        let log = recorder.log.clone();

        let (dispatcher, handle) = Dispatcher::spawn(Box::new(recorder)).unwrap();
        dispatcher.send(ObserverEvent::Connected);
        for i in 0..20 {
            dispatcher.send(ObserverEvent::GameChanged(Response::with_status(format!("s{}", i))));
        }
        dispatcher.send(ObserverEvent::Disconnected(DisconnectReason::Quit));
        handle.join().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 22);
        assert_eq!(log[0], "connected");
        for i in 0..20 {
            assert_eq!(log[i + 1], format!("s{}", i));
        }
        assert_eq!(log[21], "disconnected: quit");
    }

    #[test]
    fn test_events_after_disconnect_are_dropped() {
        let recorder = Recorder::default();
        let log = recorder.log.clone();

        let (dispatcher, handle) = Dispatcher::spawn(Box::new(recorder)).unwrap();
        dispatcher.send(ObserverEvent::Disconnected(DisconnectReason::Requested));
        handle.join().unwrap();

        // Thread is gone; this must not panic
        dispatcher.send(ObserverEvent::GameChanged(Response::with_status("late")));

        assert_eq!(*log.lock().unwrap(), vec!["disconnected: disconnect requested"]);
    }

    /// Blocks in `on_connected` until released
    struct Stalled {
        release: std::sync::mpsc::Receiver<()>,
    }

    impl GameObserver for Stalled {
        fn on_game_change(&mut self, _response: Response) {}

        fn on_connected(&mut self) {
            let _ = self.release.recv();
        }
    }

    #[test]
    fn test_backlog_tracks_slow_observer() {
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let (dispatcher, handle) =
            Dispatcher::spawn(Box::new(Stalled { release: release_rx })).unwrap();

        dispatcher.send(ObserverEvent::Connected);
        for i in 0..10 {
            dispatcher.send(ObserverEvent::GameChanged(Response::with_status(format!("s{}", i))));
        }
        // Connected may already be taken; the updates are stuck behind it
        assert!(dispatcher.backlog() >= 10);

        release_tx.send(()).unwrap();
        dispatcher.send(ObserverEvent::Disconnected(DisconnectReason::Quit));
        handle.join().unwrap();
        assert_eq!(dispatcher.backlog(), 0);
    }

    #[test]
    fn test_dropping_sender_ends_thread() {
        let (dispatcher, handle) = Dispatcher::spawn(Box::new(Recorder::default())).unwrap();
        drop(dispatcher);
        handle.join().unwrap();
    }
}
