//! Chunked message framing.
//!
//! Every logical Bolt message is transferred as a sequence of chunks, each a
//! big-endian u16 payload length followed by that many bytes, terminated by a
//! zero-length chunk (`0x00 0x00`). Chunking is orthogonal to value
//! structure: the decoder reassembles a whole message before handing it to
//! the PackStream layer, so values span chunk boundaries transparently.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

use super::message::{Request, Response};
use super::packstream::{self, marker, Value};

/// Largest chunk payload the u16 length prefix can carry, and the default
/// outbound chunk size.
pub const DEFAULT_CHUNK_SIZE: u16 = u16::MAX;

/// End-of-message marker (a zero-length chunk).
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Sanity cap on a reassembled message.
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Framing codec carrying PackStream values.
#[derive(Debug)]
pub struct BoltCodec {
    /// Outbound max chunk payload
    chunk_size: u16,
    /// Reassembly buffer for the in-flight inbound message
    message_buffer: BytesMut,
}

impl BoltCodec {
    /// Create a codec with the default chunk size.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            message_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Set the outbound chunk size. Applies to messages encoded from now on;
    /// a zero size is clamped to one byte.
    pub fn set_chunk_size(&mut self, chunk_size: u16) {
        self.chunk_size = chunk_size.max(1);
    }

    /// The current outbound chunk size.
    pub fn chunk_size(&self) -> u16 {
        self.chunk_size
    }

    /// Split one encoded message into chunks and terminate it.
    fn encode_chunked(&self, data: &[u8], dst: &mut BytesMut) {
        let size = self.chunk_size as usize;
        let mut offset = 0;

        while offset < data.len() {
            let len = (data.len() - offset).min(size);
            dst.put_u16(len as u16);
            dst.put_slice(&data[offset..offset + len]);
            offset += len;
        }

        dst.put_slice(&END_MARKER);
    }
}

impl Default for BoltCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BoltCodec {
    type Item = Value;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_len = u16::from_be_bytes([src[0], src[1]]) as usize;

            if chunk_len == 0 {
                src.advance(2);

                if self.message_buffer.is_empty() {
                    // v1 has no keepalive; a zero-length message is malformed.
                    return Err(Error::Framing("empty message".to_string()));
                }

                let message = self.message_buffer.split();
                let value = packstream::decode(&message)?;
                return Ok(Some(value));
            }

            if src.len() < 2 + chunk_len {
                return Ok(None);
            }

            if self.message_buffer.len() + chunk_len > MAX_MESSAGE_SIZE {
                return Err(Error::Framing(format!(
                    "message exceeds {} bytes",
                    MAX_MESSAGE_SIZE
                )));
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_len]);
            src.advance(chunk_len);
        }
    }
}

impl Encoder<Value> for BoltCodec {
    type Error = Error;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = packstream::encode(&item)?;
        self.encode_chunked(&encoded, dst);
        Ok(())
    }
}

/// Client-side codec: encodes requests, decodes responses.
#[derive(Debug, Default)]
pub struct ResponseCodec {
    inner: BoltCodec,
}

impl ResponseCodec {
    /// Create a new response codec.
    pub fn new() -> Self {
        Self {
            inner: BoltCodec::new(),
        }
    }

    /// Set the outbound chunk size.
    pub fn set_chunk_size(&mut self, chunk_size: u16) {
        self.inner.set_chunk_size(chunk_size);
    }
}

impl Decoder for ResponseCodec {
    type Item = Response;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(value) => {
                let structure = value.as_structure().ok_or_else(|| {
                    Error::UnrecognizedResponse(format!(
                        "top-level {} is not a message",
                        value.type_name()
                    ))
                })?;
                Ok(Some(Response::from_structure(structure)?))
            }
            None => Ok(None),
        }
    }
}

impl<'a> Encoder<&'a Request> for ResponseCodec {
    type Error = Error;

    fn encode(&mut self, item: &'a Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner
            .encode(Value::Structure(item.to_structure()), dst)
    }
}

/// Decode one chunked message from a complete byte slice.
pub fn decode_message(bytes: &[u8]) -> Result<Value, Error> {
    let mut codec = BoltCodec::new();
    let mut buf = BytesMut::from(bytes);
    codec
        .decode(&mut buf)?
        .ok_or_else(|| Error::Framing("message not terminated".to_string()))
}

/// Cheaply check whether `m` might be a chunked, PackStream-encoded map.
///
/// Verifies there is room for a chunk length, a marker, and the terminator;
/// that the first payload byte is a map marker; and that the chunk lengths
/// walk off the end exactly onto the zero terminator. Used to recognize a
/// pre-encoded map handed through an opaque byte parameter.
pub fn maybe_map(m: &[u8]) -> bool {
    // chunk length + marker + terminator
    if m.len() < 2 + 1 + END_MARKER.len() {
        return false;
    }

    match m[2] {
        b if marker::is_tiny_map(b) => {}
        marker::MAP_8 | marker::MAP_16 | marker::MAP_32 => {}
        _ => return false,
    }

    let mut pos = 0usize;
    loop {
        if m.len() - pos < 2 {
            return false;
        }
        let chunk_len = u16::from_be_bytes([m[pos], m[pos + 1]]) as usize;
        pos += 2;
        if chunk_len == 0 {
            return pos == m.len();
        }
        if m.len() - pos < chunk_len {
            return false;
        }
        pos += chunk_len;
    }
}
