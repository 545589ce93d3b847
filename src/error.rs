//! Error types for kadnode.

use thiserror::Error;

/// Result type alias for kadnode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the node's API boundary.
///
/// Per-RPC failures (timeouts, unreachable peers) are absorbed inside the lookup
/// engine and never reach here; this enum only covers conditions the outer API
/// must surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport closed")]
    TransportClosed,

    #[error("request timed out")]
    Timeout,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("value too large for a single datagram ({0} bytes)")]
    ValueTooLarge(usize),

    #[error("configuration error: {0}")]
    Config(String),
}
