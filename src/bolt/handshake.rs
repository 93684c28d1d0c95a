//! Bolt version handshake.
//!
//! Immediately after connecting, the client sends a 20-byte preamble: a
//! 4-byte magic followed by four big-endian u32 version proposals. The server
//! answers with a single big-endian u32 naming the version it selected, or
//! zero if none of the proposals suit it.

use crate::error::{Error, Result};

/// Magic preamble opening every Bolt connection.
pub const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// The protocol version this driver speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Size of the server's handshake reply.
pub const HANDSHAKE_RESPONSE_SIZE: usize = 4;

/// Build the 20-byte client preamble. Only version 1 is proposed; the
/// remaining three slots are zero.
pub fn proposal() -> [u8; 20] {
    let mut buf = [0u8; 20];
    buf[0..4].copy_from_slice(&BOLT_MAGIC);
    buf[4..8].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    buf
}

/// Parse the server's 4-byte selection.
///
/// Zero means the server supports none of the proposed versions; anything
/// other than the single version we proposed is equally fatal.
pub fn parse_selection(response: [u8; HANDSHAKE_RESPONSE_SIZE]) -> Result<u32> {
    let version = u32::from_be_bytes(response);
    if version == 0 {
        return Err(Error::Handshake(
            "server does not support any proposed version".to_string(),
        ));
    }
    if version != PROTOCOL_VERSION {
        return Err(Error::Handshake(format!(
            "server selected unsupported version {}",
            version
        )));
    }
    Ok(version)
}
