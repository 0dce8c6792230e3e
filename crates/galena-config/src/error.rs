//! Configuration error types.

use thiserror::Error;

/// Errors produced while validating a loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The timing section is internally inconsistent.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    /// A peer entry is malformed or duplicated.
    #[error("invalid peer entry: {0}")]
    InvalidPeer(String),

    /// The node id is missing or reserved.
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),
}
