//! Error types for the store module.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Empty key or value. A caller bug; never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Key absent from the store.
    #[error("value for key {0:?} not found")]
    NotFound(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store was closed.
    #[error("store is closed")]
    Closed,

    /// A backend call exceeded its deadline.
    #[error("backend operation timed out after {0:?}")]
    Timeout(Duration),

    /// A write was rolled back because its caller had already timed out.
    #[error("write abandoned after its deadline")]
    Abandoned,

    /// Index and primary store disagree.
    #[error("index inconsistency: {0}")]
    Inconsistent(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking backend task failed to complete.
    #[error("backend task failed: {0}")]
    Task(String),

    /// A lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller passed an empty key or value.
    InvalidArgument,
    /// Key not present. Callers treat this as "no data yet".
    NotFound,
    /// Backend unavailable, closed, timed out, or inconsistent. May be retried.
    Storage,
}

impl StoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Storage,
        }
    }

    /// Whether this is a missing key.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether this is a backend-level failure.
    pub fn is_storage(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    pub(crate) fn poisoned(err: impl std::fmt::Display) -> Self {
        StoreError::Poisoned(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
