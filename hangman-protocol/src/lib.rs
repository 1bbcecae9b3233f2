//! hangman-protocol: wire definitions for client-server communication
//!
//! This crate defines the request/response payloads exchanged between the
//! hangman client and a game server, and the length-prefixed codec that
//! frames them on a TCP stream.

pub mod codec;
pub mod messages;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, ServerCodec, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_LEN};
pub use messages::{Request, RequestKind, Response};
