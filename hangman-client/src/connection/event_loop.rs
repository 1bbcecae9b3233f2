//! Readiness-driven I/O loop
//!
//! The loop is the only code that touches the socket. It runs on a
//! dedicated thread inside a single-threaded tokio runtime, whose reactor is
//! the readiness multiplexer: each iteration waits on
//! [`TcpStream::ready`] for the current interest set, or on a wake-up from a
//! producer thread, whichever comes first.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, BytesMut};
use hangman_protocol::ClientCodec;
use hangman_utils::{HangmanError, Result};
use tokio::io::{AsyncWriteExt, Interest};
use tokio::net::{TcpSocket, TcpStream};
use tokio_util::codec::{Decoder, Encoder};

use super::dispatch::{Dispatcher, ObserverEvent};
use super::handler::DisconnectReason;
use super::queue::OutboundQueue;
use super::state::{ConnectionState, StateMachine};
use crate::config::ConnectionConfig;

/// State shared between the public handle and the I/O loop
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: StateMachine,
    pub(crate) queue: OutboundQueue,
    /// Set by `disconnect`; the loop tears down on its next iteration
    pub(crate) shutdown: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: StateMachine::new(),
            queue: OutboundQueue::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

pub(crate) struct EventLoop {
    shared: std::sync::Arc<Shared>,
    dispatcher: Dispatcher,
    codec: ClientCodec,
    /// Received bytes not yet decoded into a full frame
    read_buf: BytesMut,
    /// Unwritten tail of the frame currently going out
    write_buf: BytesMut,
    read_chunk: usize,
    nodelay: bool,
}

impl EventLoop {
    pub(crate) fn new(
        shared: std::sync::Arc<Shared>,
        dispatcher: Dispatcher,
        config: &ConnectionConfig,
    ) -> Self {
        Self {
            shared,
            dispatcher,
            codec: ClientCodec::with_max_frame_size(config.max_frame_size),
            read_buf: BytesMut::with_capacity(config.read_buffer_capacity),
            write_buf: BytesMut::new(),
            read_chunk: config.read_buffer_capacity,
            nodelay: config.nodelay,
        }
    }

    /// Connect, serve the connection until it ends, then report why
    pub(crate) async fn run(mut self, socket: TcpSocket, addr: SocketAddr) {
        let reason = match self.drive(socket, addr).await {
            Ok(reason) => reason,
            // Peer hung up after our QUIT went out: that is the normal end
            Err(HangmanError::PeerClosed)
                if self.shared.state.current() == ConnectionState::Closing
                    && self.flushed() =>
            {
                DisconnectReason::Quit
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(%addr, error = %e, "Connection failed");
                DisconnectReason::Error(e)
            }
            Err(e) => {
                tracing::error!(%addr, error = %e, "I/O loop aborted");
                DisconnectReason::Error(e)
            }
        };

        self.shared.state.close();
        let dropped = self.shared.queue.clear();
        if dropped > 0 {
            tracing::warn!(dropped, "Discarding requests that were never sent");
        }

        tracing::info!(
            %addr,
            %reason,
            undelivered = self.dispatcher.backlog(),
            "Connection closed"
        );
        self.dispatcher.send(ObserverEvent::Disconnected(reason));
    }

    async fn drive(&mut self, socket: TcpSocket, addr: SocketAddr) -> Result<DisconnectReason> {
        let mut stream = tokio::select! {
            result = socket.connect(addr) => result.map_err(|e| {
                HangmanError::connection(format!("Failed to connect to {}: {}", addr, e))
            })?,
            _ = self.wait_for_shutdown() => return Ok(DisconnectReason::Requested),
        };

        if let Err(e) = stream.set_nodelay(self.nodelay) {
            tracing::warn!("Failed to set TCP_NODELAY: {}", e);
        }

        self.shared
            .state
            .transition(ConnectionState::Connecting, ConnectionState::Connected)
            .map_err(|actual| {
                HangmanError::internal(format!("Handshake finished in state {}", actual))
            })?;
        tracing::info!(%addr, "Connected to server");
        self.dispatcher.send(ObserverEvent::Connected);

        let mut interest = Interest::READABLE;
        loop {
            if self.shared.shutdown_requested() {
                return Ok(DisconnectReason::Requested);
            }

            if self.shared.queue.take_wake() {
                interest = Interest::READABLE | Interest::WRITABLE;
            }

            if self.shared.state.current() == ConnectionState::Closing && self.flushed() {
                tracing::debug!("QUIT sent, closing connection");
                if let Err(e) = stream.shutdown().await {
                    tracing::debug!("Shutdown after QUIT failed: {}", e);
                }
                return Ok(DisconnectReason::Quit);
            }

            let ready = tokio::select! {
                ready = stream.ready(interest) => ready?,
                _ = self.shared.queue.notified() => continue,
            };

            if ready.is_readable() {
                self.read_cycle(&stream)?;
            }

            if ready.is_writable() && self.drain_cycle(&stream)? {
                interest = Interest::READABLE;
            }
        }
    }

    /// Nothing queued and nothing half-written
    fn flushed(&self) -> bool {
        self.write_buf.is_empty() && self.shared.queue.is_empty()
    }

    async fn wait_for_shutdown(&self) {
        while !self.shared.shutdown_requested() {
            self.shared.queue.notified().await;
        }
    }

    /// Read what the socket has and hand every complete frame to the observer
    fn read_cycle(&mut self, stream: &TcpStream) -> Result<()> {
        // Sets the read chunk size; a 0-byte read then always means EOF
        self.read_buf.reserve(self.read_chunk);

        match stream.try_read_buf(&mut self.read_buf) {
            Ok(0) => return Err(HangmanError::PeerClosed),
            Ok(n) => {
                tracing::trace!(bytes = n, buffered = self.read_buf.len(), "Read from socket");
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        while let Some(response) = self.codec.decode(&mut self.read_buf)? {
            tracing::debug!(
                status = %response.status,
                remaining_attempts = response.remaining_attempts,
                "Received game state"
            );
            self.dispatcher.send(ObserverEvent::GameChanged(response));
        }
        Ok(())
    }

    /// Write queued frames until the queue is empty or the socket is full
    ///
    /// Returns `true` once everything has been written. A frame the socket
    /// only took part of stays in `write_buf`, and the next request is not
    /// taken until that remainder is gone.
    fn drain_cycle(&mut self, stream: &TcpStream) -> Result<bool> {
        loop {
            if self.write_buf.is_empty() {
                let Some(request) = self.shared.queue.pop() else {
                    return Ok(true);
                };
                let kind = request.kind();
                self.codec.encode(request, &mut self.write_buf)?;
                tracing::debug!(%kind, frame_len = self.write_buf.len(), "Sending request");
            }

            match stream.try_write(&self.write_buf) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
                Ok(n) => {
                    self.write_buf.advance(n);
                    if !self.write_buf.is_empty() {
                        tracing::trace!(
                            written = n,
                            remaining = self.write_buf.len(),
                            "Partial write"
                        );
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handler::GameObserver;
    use hangman_protocol::{Request, Response, ServerCodec};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    struct Forward(mpsc::UnboundedSender<String>);

    impl GameObserver for Forward {
        fn on_game_change(&mut self, response: Response) {
            let _ = self.0.send(response.status);
        }

        fn on_connected(&mut self) {
            let _ = self.0.send("connected".into());
        }

        fn on_disconnected(&mut self, reason: DisconnectReason) {
            let _ = self.0.send(format!("disconnected: {}", reason));
        }
    }

    fn event_loop(shared: Arc<Shared>) -> (EventLoop, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (dispatcher, _handle) = Dispatcher::spawn(Box::new(Forward(tx))).unwrap();
        let event_loop = EventLoop::new(shared, dispatcher, &ConnectionConfig::default());
        (event_loop, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for observer")
            .expect("observer channel closed")
    }

    fn connecting() -> Arc<Shared> {
        let shared = Arc::new(Shared::new());
        shared
            .state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
            .unwrap();
        shared
    }

    #[tokio::test]
    async fn test_drain_cycle_writes_frames_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = connecting();
        let (event_loop, mut rx) = event_loop(shared.clone());

        let client = tokio::spawn(event_loop.run(TcpSocket::new_v4().unwrap(), addr));
        let (mut server, _) = listener.accept().await.unwrap();
        assert_eq!(next(&mut rx).await, "connected");

        for request in [Request::NewGame, Request::GuessLetter('q'), Request::guess_word("quiz")] {
            shared.queue.push_if(request, || Ok(())).unwrap();
        }

        let mut expected = BytesMut::new();
        let mut codec = ClientCodec::new();
        codec.encode(Request::NewGame, &mut expected).unwrap();
        codec.encode(Request::GuessLetter('q'), &mut expected).unwrap();
        codec.encode(Request::guess_word("quiz"), &mut expected).unwrap();

        let mut received = vec![0u8; expected.len()];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(&received[..], &expected[..]);

        shared.shutdown.store(true, Ordering::Release);
        shared.queue.wake();
        client.await.unwrap();
        assert_eq!(next(&mut rx).await, "disconnected: disconnect requested");
        assert_eq!(shared.state.current(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_read_cycle_decodes_back_to_back_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = connecting();
        let (event_loop, mut rx) = event_loop(shared.clone());

        let client = tokio::spawn(event_loop.run(TcpSocket::new_v4().unwrap(), addr));
        let (mut server, _) = listener.accept().await.unwrap();
        assert_eq!(next(&mut rx).await, "connected");

        // Two frames in one write
        let mut out = BytesMut::new();
        let mut codec = ServerCodec::new();
        codec.encode(Response::with_status("one"), &mut out).unwrap();
        codec.encode(Response::with_status("two"), &mut out).unwrap();
        server.write_all(&out).await.unwrap();

        assert_eq!(next(&mut rx).await, "one");
        assert_eq!(next(&mut rx).await, "two");

        drop(server);
        client.await.unwrap();
        assert_eq!(next(&mut rx).await, "disconnected: Server closed the connection");
    }

    #[tokio::test]
    async fn test_shutdown_during_handshake() {
        // Non-routable address keeps the handshake pending
        let addr: SocketAddr = "10.255.255.1:9".parse().unwrap();
        let shared = connecting();
        let (event_loop, mut rx) = event_loop(shared.clone());

        let client = tokio::spawn(event_loop.run(TcpSocket::new_v4().unwrap(), addr));
        shared.shutdown.store(true, Ordering::Release);
        shared.queue.wake();

        client.await.unwrap();
        let event = next(&mut rx).await;
        assert!(event.starts_with("disconnected"), "got {}", event);
        assert_eq!(shared.state.current(), ConnectionState::Closed);
    }
}
