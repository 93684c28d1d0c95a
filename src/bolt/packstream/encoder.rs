//! PackStream encoder.

use bytes::{BufMut, BytesMut};
use std::collections::HashMap;

use super::marker::*;
use super::types::{Structure, Value};
use super::PackStreamError;

/// PackStream encoder that writes values into a byte buffer.
///
/// Chunking is not this type's concern; it produces the raw marker-tagged
/// encoding and the framer splits it afterwards.
pub struct PackStreamEncoder {
    buffer: BytesMut,
}

impl PackStreamEncoder {
    /// Create a new encoder with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new encoder with the given buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the encoder and return the bytes.
    pub fn into_bytes(self) -> BytesMut {
        self.buffer
    }

    /// The encoded bytes so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> Result<(), PackStreamError> {
        match value {
            Value::Null => {
                self.encode_null();
                Ok(())
            }
            Value::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            Value::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            Value::Float(f) => {
                self.encode_float(*f);
                Ok(())
            }
            Value::String(s) => self.encode_string(s),
            Value::List(l) => self.encode_list(l),
            Value::Map(m) => self.encode_map(m),
            Value::Structure(s) => self.encode_structure(s),
        }
    }

    /// Encode null.
    pub fn encode_null(&mut self) {
        self.buffer.put_u8(NULL);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(if value { TRUE } else { FALSE });
    }

    /// Encode an integer using the smallest representation.
    ///
    /// Tiny covers -16..=127 in a single byte; INT_8 only ever carries the
    /// negative range -128..-16 since everything a positive INT_8 could hold
    /// is already tiny.
    pub fn encode_int(&mut self, value: i64) {
        if fits_tiny_int(value) {
            self.buffer.put_u8(value as u8);
        } else if (i8::MIN as i64..=i8::MAX as i64).contains(&value) {
            self.buffer.put_u8(INT_8);
            self.buffer.put_i8(value as i8);
        } else if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
            self.buffer.put_u8(INT_16);
            self.buffer.put_i16(value as i16);
        } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
            self.buffer.put_u8(INT_32);
            self.buffer.put_i32(value as i32);
        } else {
            self.buffer.put_u8(INT_64);
            self.buffer.put_i64(value);
        }
    }

    /// Encode a float (always 64-bit big-endian).
    pub fn encode_float(&mut self, value: f64) {
        self.buffer.put_u8(FLOAT_64);
        self.buffer.put_f64(value);
    }

    /// Encode a string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        let len = bytes.len();

        if len > u32::MAX as usize {
            return Err(PackStreamError::ValueTooLarge("string", len));
        }

        if len <= TINY_MAX_LEN {
            self.buffer.put_u8(TINY_STRING_BASE + len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(STRING_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(STRING_16);
            self.buffer.put_u16(len as u16);
        } else {
            self.buffer.put_u8(STRING_32);
            self.buffer.put_u32(len as u32);
        }

        self.buffer.put_slice(bytes);
        Ok(())
    }

    /// Encode a list.
    pub fn encode_list(&mut self, values: &[Value]) -> Result<(), PackStreamError> {
        let len = values.len();

        if len > u32::MAX as usize {
            return Err(PackStreamError::ValueTooLarge("list", len));
        }

        if len <= TINY_MAX_LEN {
            self.buffer.put_u8(TINY_LIST_BASE + len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(LIST_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(LIST_16);
            self.buffer.put_u16(len as u16);
        } else {
            self.buffer.put_u8(LIST_32);
            self.buffer.put_u32(len as u32);
        }

        for value in values {
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a map.
    pub fn encode_map(&mut self, map: &HashMap<String, Value>) -> Result<(), PackStreamError> {
        let len = map.len();

        if len > u32::MAX as usize {
            return Err(PackStreamError::ValueTooLarge("map", len));
        }

        if len <= TINY_MAX_LEN {
            self.buffer.put_u8(TINY_MAP_BASE + len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(MAP_8);
            self.buffer.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buffer.put_u8(MAP_16);
            self.buffer.put_u16(len as u16);
        } else {
            self.buffer.put_u8(MAP_32);
            self.buffer.put_u32(len as u32);
        }

        for (key, value) in map {
            self.encode_string(key)?;
            self.encode(value)?;
        }
        Ok(())
    }

    /// Encode a structure. Structures top out at 65535 fields.
    pub fn encode_structure(&mut self, s: &Structure) -> Result<(), PackStreamError> {
        let len = s.fields.len();

        if len > u16::MAX as usize {
            return Err(PackStreamError::ValueTooLarge("structure fields", len));
        }

        if len <= TINY_MAX_LEN {
            self.buffer.put_u8(TINY_STRUCT_BASE + len as u8);
        } else if len <= u8::MAX as usize {
            self.buffer.put_u8(STRUCT_8);
            self.buffer.put_u8(len as u8);
        } else {
            self.buffer.put_u8(STRUCT_16);
            self.buffer.put_u16(len as u16);
        }

        self.buffer.put_u8(s.tag);

        for field in &s.fields {
            self.encode(field)?;
        }
        Ok(())
    }
}

impl Default for PackStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a single value to bytes.
pub fn encode(value: &Value) -> Result<BytesMut, PackStreamError> {
    let mut encoder = PackStreamEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}
