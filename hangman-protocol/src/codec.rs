//! Length-prefixed message codec
//!
//! Every frame is a 4-byte big-endian payload length followed by the bincode
//! encoding of one message. The prefix does not count itself.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{Request, Response};

/// Size of the frame length prefix
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default maximum payload size (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Codec for Request (encoding) and Response (decoding)
/// Used by the client side
#[derive(Debug, Clone, Copy)]
pub struct ClientCodec {
    max_frame_size: usize,
}

impl ClientCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a codec that rejects payloads above `max_frame_size` bytes
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Check that `request` fits in one frame without encoding it
    pub fn check_size(&self, request: &Request) -> Result<(), CodecError> {
        let size = bincode::serialized_size(request)? as usize;
        if size > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = Response;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, self.max_frame_size)
    }
}

impl Encoder<Request> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst, self.max_frame_size)
    }
}

/// Codec for Response (encoding) and Request (decoding)
/// Used by the server side
#[derive(Debug, Clone, Copy)]
pub struct ServerCodec {
    max_frame_size: usize,
}

impl ServerCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = Request;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, self.max_frame_size)
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst, self.max_frame_size)
    }
}

/// Decode a length-prefixed message
///
/// Leaves `src` untouched until a whole frame is buffered.
fn decode_message<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
    max: usize,
) -> Result<Option<T>, CodecError> {
    if src.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }

    // Peek at length without consuming
    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

    if len > max {
        return Err(CodecError::FrameTooLarge { size: len, max });
    }

    if src.len() < LENGTH_PREFIX_LEN + len {
        // Reserve space for the rest of the frame
        src.reserve(LENGTH_PREFIX_LEN + len - src.len());
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX_LEN);
    let data = src.split_to(len);

    let msg: T = bincode::deserialize(&data)?;
    Ok(Some(msg))
}

/// Encode a length-prefixed message
fn encode_message<T: serde::Serialize>(
    item: &T,
    dst: &mut BytesMut,
    max: usize,
) -> Result<(), CodecError> {
    let data = bincode::serialize(item)?;
    let len = frame_len(data.len(), max)?;

    dst.reserve(LENGTH_PREFIX_LEN + data.len());
    dst.put_u32(len);
    dst.put_slice(&data);
    Ok(())
}

/// Length prefix for a `size`-byte payload
///
/// Fails if the payload is over `max` or does not fit the 4-byte prefix.
fn frame_len(size: usize, max: usize) -> Result<u32, CodecError> {
    if size > max {
        return Err(CodecError::FrameTooLarge { size, max });
    }
    u32::try_from(size).map_err(|_| CodecError::FrameTooLarge {
        size,
        max: u32::MAX as usize,
    })
}
