//! Datagram codec.
//!
//! One datagram carries exactly one JSON-encoded [`Message`]. Decoding
//! validates the whole record up front; protocol code never sees a datagram
//! that failed to parse.

use crate::error::WireError;
use crate::message::Message;

/// Maximum encoded datagram size in bytes.
///
/// 64 KiB is the UDP payload ceiling; anything near it would already be
/// fragmenting, so oversized messages are rejected at encode time rather
/// than truncated on the wire.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Encodes a message into a single datagram payload.
pub fn encode(msg: &Message) -> Result<Vec<u8>, WireError> {
    let bytes = serde_json::to_vec(msg).map_err(WireError::Encode)?;
    if bytes.len() > MAX_DATAGRAM {
        return Err(WireError::Oversized {
            size: bytes.len(),
            max: MAX_DATAGRAM,
        });
    }
    Ok(bytes)
}

/// Decodes a datagram payload into a message.
pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
    serde_json::from_slice(bytes).map_err(WireError::Malformed)
}
