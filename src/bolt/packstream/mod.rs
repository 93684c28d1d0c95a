//! PackStream serialization.
//!
//! PackStream is the self-describing binary format the Bolt protocol uses for
//! every value crossing the wire. Each value is prefixed with a marker byte;
//! sizes are folded into the marker for small values and spelled out as
//! big-endian length prefixes otherwise.
//!
//! # Value universe (protocol version 1)
//!
//! - **Null**, **Boolean**: single-byte markers
//! - **Integer**: signed 64-bit, narrowed to the smallest wire width
//! - **Float**: 64-bit IEEE 754
//! - **String**: UTF-8 with a length prefix
//! - **List**: ordered, heterogeneous
//! - **Map**: string keys to arbitrary values
//! - **Structure**: a one-byte signature plus fields, used for graph
//!   entities (Node, Relationship, UnboundRelationship, Path) and the
//!   session-layer message catalog

pub mod decoder;
pub mod encoder;
pub mod marker;
pub mod structures;
pub mod types;

pub use decoder::{decode, PackStreamDecoder};
pub use encoder::{encode, PackStreamEncoder};
pub use structures::{Node, Path, Relationship, UnboundRelationship};
pub use types::{Structure, Value};

use std::fmt;

/// PackStream codec errors. All of these are fatal to the connection that
/// produced them.
#[derive(Debug, Clone)]
pub enum PackStreamError {
    /// Input ended in the middle of a value
    UnexpectedEof,
    /// Marker byte outside the grammar
    UnknownMarker(u8),
    /// String payload was not valid UTF-8
    InvalidUtf8(String),
    /// Map key decoded to a non-string value
    InvalidMapKey(&'static str),
    /// Structure signature outside the registered graph/message tags
    UnknownSignature(u8),
    /// Value exceeds what its length prefix can express
    ValueTooLarge(&'static str, usize),
    /// Structure fields did not match the registered shape
    InvalidStructure(String),
}

impl fmt::Display for PackStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackStreamError::UnexpectedEof => write!(f, "unexpected end of PackStream data"),
            PackStreamError::UnknownMarker(m) => write!(f, "unknown marker byte: 0x{:02X}", m),
            PackStreamError::InvalidUtf8(e) => write!(f, "invalid UTF-8 in string: {}", e),
            PackStreamError::InvalidMapKey(t) => {
                write!(f, "map keys must be strings, got {}", t)
            }
            PackStreamError::UnknownSignature(s) => {
                write!(f, "unknown structure signature: 0x{:02X}", s)
            }
            PackStreamError::ValueTooLarge(t, n) => write!(f, "{} too large: {} items", t, n),
            PackStreamError::InvalidStructure(msg) => write!(f, "invalid structure: {}", msg),
        }
    }
}

impl std::error::Error for PackStreamError {}
