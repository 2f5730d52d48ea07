//! Error types for the Escrow Ledger Core.

use thiserror::Error;

/// Core errors that can occur while parsing keys or encoding payloads.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown event prefix: {0:?}")]
    UnknownPrefix(String),

    #[error("malformed key {key:?}: {reason}")]
    MalformedKey { key: String, reason: &'static str },

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
