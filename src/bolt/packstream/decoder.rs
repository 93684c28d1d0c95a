//! PackStream decoder.

use bytes::Buf;
use std::collections::HashMap;

use crate::bolt::message::tag;

use super::marker::*;
use super::types::{Structure, Value};
use super::PackStreamError;

/// PackStream decoder over a complete message's bytes.
///
/// The chunked framer reassembles a logical message before decoding, so the
/// decoder never sees chunk boundaries; values span them transparently.
pub struct PackStreamDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PackStreamDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Remaining byte count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> Result<Value, PackStreamError> {
        let marker = self.read_u8()?;

        // Tiny types first; the nibble ranges cover most traffic.
        if is_tiny_string(marker) {
            return self.read_string_data(tiny_len(marker));
        }
        if is_tiny_list(marker) {
            return self.read_list_data(tiny_len(marker));
        }
        if is_tiny_map(marker) {
            return self.read_map_data(tiny_len(marker));
        }
        if is_tiny_struct(marker) {
            return self.read_struct_data(tiny_len(marker));
        }
        if is_tiny_int(marker) {
            return Ok(Value::Integer(decode_tiny_int(marker) as i64));
        }

        match marker {
            NULL => Ok(Value::Null),
            TRUE => Ok(Value::Boolean(true)),
            FALSE => Ok(Value::Boolean(false)),

            FLOAT_64 => Ok(Value::Float(self.read_f64()?)),

            INT_8 => Ok(Value::Integer(self.read_i8()? as i64)),
            INT_16 => Ok(Value::Integer(self.read_i16()? as i64)),
            INT_32 => Ok(Value::Integer(self.read_i32()? as i64)),
            INT_64 => Ok(Value::Integer(self.read_i64()?)),

            STRING_8 => {
                let len = self.read_u8()? as usize;
                self.read_string_data(len)
            }
            STRING_16 => {
                let len = self.read_u16()? as usize;
                self.read_string_data(len)
            }
            STRING_32 => {
                let len = self.read_u32()? as usize;
                self.read_string_data(len)
            }

            LIST_8 => {
                let len = self.read_u8()? as usize;
                self.read_list_data(len)
            }
            LIST_16 => {
                let len = self.read_u16()? as usize;
                self.read_list_data(len)
            }
            LIST_32 => {
                let len = self.read_u32()? as usize;
                self.read_list_data(len)
            }

            MAP_8 => {
                let len = self.read_u8()? as usize;
                self.read_map_data(len)
            }
            MAP_16 => {
                let len = self.read_u16()? as usize;
                self.read_map_data(len)
            }
            MAP_32 => {
                let len = self.read_u32()? as usize;
                self.read_map_data(len)
            }

            STRUCT_8 => {
                let len = self.read_u8()? as usize;
                self.read_struct_data(len)
            }
            STRUCT_16 => {
                let len = self.read_u16()? as usize;
                self.read_struct_data(len)
            }

            // Everything else, including the v2+ byte-array markers
            // (0xCC..0xCE), is outside the v1 grammar.
            _ => Err(PackStreamError::UnknownMarker(marker)),
        }
    }

    fn read_string_data(&mut self, len: usize) -> Result<Value, PackStreamError> {
        let bytes = self.read_bytes(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| PackStreamError::InvalidUtf8(e.to_string()))?;
        Ok(Value::String(s.to_string()))
    }

    fn read_list_data(&mut self, len: usize) -> Result<Value, PackStreamError> {
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::List(items))
    }

    fn read_map_data(&mut self, len: usize) -> Result<Value, PackStreamError> {
        let mut map = HashMap::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = match self.decode()? {
                Value::String(s) => s,
                other => return Err(PackStreamError::InvalidMapKey(other.type_name())),
            };
            let value = self.decode()?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn read_struct_data(&mut self, field_count: usize) -> Result<Value, PackStreamError> {
        let tag = self.read_u8()?;
        if !is_known_signature(tag) {
            return Err(PackStreamError::UnknownSignature(tag));
        }
        let mut fields = Vec::with_capacity(field_count.min(64));
        for _ in 0..field_count {
            fields.push(self.decode()?);
        }
        Ok(Value::Structure(Structure::new(tag, fields)))
    }

    // Low-level reads, all big-endian.

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        if self.remaining() < 1 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_i8(&mut self) -> Result<i8, PackStreamError> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        if self.remaining() < 2 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_u16();
        self.pos += 2;
        Ok(value)
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        if self.remaining() < 4 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_u32();
        self.pos += 4;
        Ok(value)
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        Ok(self.read_u32()? as i32)
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        if self.remaining() < 8 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_i64();
        self.pos += 8;
        Ok(value)
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        if self.remaining() < 8 {
            return Err(PackStreamError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_f64();
        self.pos += 8;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PackStreamError> {
        if self.remaining() < len {
            return Err(PackStreamError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }
}

/// Whether a structure signature belongs to the registered graph or message
/// types. Anything else is fatal.
fn is_known_signature(sig: u8) -> bool {
    matches!(
        sig,
        NODE_TAG
            | RELATIONSHIP_TAG
            | PATH_TAG
            | UNBOUND_RELATIONSHIP_TAG
            | tag::INIT
            | tag::ACK_FAILURE
            | tag::RESET
            | tag::RUN
            | tag::DISCARD_ALL
            | tag::PULL_ALL
            | tag::SUCCESS
            | tag::RECORD
            | tag::IGNORED
            | tag::FAILURE
    )
}

/// Decode a single value from bytes.
pub fn decode(data: &[u8]) -> Result<Value, PackStreamError> {
    let mut decoder = PackStreamDecoder::new(data);
    decoder.decode()
}
