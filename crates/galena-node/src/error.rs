//! Node error types.

use std::net::SocketAddr;

use galena_wire::WireError;
use thiserror::Error;

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Errors that can occur while running a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Wire protocol error.
    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] galena_config::ConfigError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Bind failed.
    #[error("failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// An address in the configuration did not parse.
    #[error("invalid address for {id}: {addr}")]
    InvalidAddr { id: String, addr: String },
}
