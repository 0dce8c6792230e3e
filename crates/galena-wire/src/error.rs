//! Wire protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding datagrams.
#[derive(Debug, Error)]
pub enum WireError {
    /// The datagram is not a well-formed message (bad JSON, unknown `type`
    /// tag, or a missing/mistyped field).
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The message failed to serialize.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The encoded message exceeds the datagram size ceiling.
    #[error("datagram too large: {size} bytes (max {max})")]
    Oversized { size: usize, max: usize },
}
