//! Bolt v1 protocol internals.
//!
//! The wire layers, bottom up:
//!
//! - [`packstream`] - marker-tagged binary serialization of values
//! - [`codec`] - chunked framing of logical messages over a byte stream
//! - [`message`] - the session-layer message catalog
//! - [`handshake`] - version negotiation preamble
//!
//! Most users should use the high-level [`crate::driver`] module instead of
//! these directly.

pub mod codec;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{maybe_map, BoltCodec, ResponseCodec, DEFAULT_CHUNK_SIZE};
pub use message::{AuthToken, Failure, Record, Request, Response, Success};
pub use packstream::{
    Node, PackStreamError, Path, Relationship, Structure, UnboundRelationship, Value,
};
