//! Error types for the Ledger.

use escrow_ledger_core::CoreError;
use escrow_ledger_store::{ErrorKind, StoreError};
use thiserror::Error;

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Key or payload error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Invalid ledger configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LedgerError {
    /// The store error classification, if this came from the store.
    pub fn store_kind(&self) -> Option<ErrorKind> {
        match self {
            LedgerError::Store(e) => Some(e.kind()),
            LedgerError::Core(_) | LedgerError::Config(_) => None,
        }
    }

    /// Whether the underlying store has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, LedgerError::Store(StoreError::Closed))
    }
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
