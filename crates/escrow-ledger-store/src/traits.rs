//! Backend trait: the abstract interface for key-value persistence.
//!
//! This trait allows the store to be engine-agnostic. Implementations
//! include SQLite (persistent) and in-memory (tests, ephemeral deployments).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use escrow_ledger_core::KeyDigest;

use crate::error::Result;

/// The Backend trait: async interface over two logical tables.
///
/// - The **primary** table maps a [`KeyDigest`] to the stored value.
/// - The **index** maps the literal key to its digest, ordered by key so that
///   prefix scans are range scans.
///
/// All methods are async to support both sync (SQLite) and async engines.
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic upsert**: `upsert` writes both tables or neither.
/// - **Consistent scans**: one `scan_prefix` call reads a single backend state.
/// - **No deletes**: records are append/overwrite only.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Upsert `digest -> value` in the primary table and `key -> digest` in
    /// the index, atomically.
    ///
    /// The write may only be made durable after [`CommitGate::claim`]
    /// succeeds. If the gate was abandoned, nothing is written and the call
    /// fails with [`StoreError::Abandoned`](crate::StoreError::Abandoned).
    async fn upsert(&self, key: &str, digest: KeyDigest, value: &str, gate: CommitGate)
        -> Result<()>;

    /// Look up a value by digest.
    async fn fetch(&self, digest: &KeyDigest) -> Result<Option<String>>;

    /// Look up the index entry for a literal key.
    async fn index_entry(&self, key: &str) -> Result<Option<KeyDigest>>;

    /// Get all `(key, value)` pairs whose key starts with `prefix`.
    ///
    /// Returns pairs ordered by key. An index entry with no primary value is
    /// reported as [`StoreError::Inconsistent`](crate::StoreError::Inconsistent).
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Release engine resources. Later calls fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> Result<()>;
}

const OPEN: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

/// One-shot arbiter between a backend about to commit a write and a caller
/// about to give up on it.
///
/// Exactly one of [`claim`](Self::claim) and [`abandon`](Self::abandon)
/// succeeds, so a write reported as timed out is never applied.
#[derive(Debug, Clone, Default)]
pub struct CommitGate(Arc<AtomicU8>);

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend side: take the right to commit.
    pub fn claim(&self) -> bool {
        self.transition(CLAIMED)
    }

    /// Caller side: forbid the commit.
    pub fn abandon(&self) -> bool {
        self.transition(ABANDONED)
    }

    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABANDONED
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(OPEN, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_is_one_shot() {
        let gate = CommitGate::new();
        assert!(gate.claim());
        assert!(!gate.abandon());
        assert!(!gate.is_abandoned());

        let gate = CommitGate::new();
        assert!(gate.clone().abandon());
        assert!(!gate.claim());
        assert!(gate.is_abandoned());
    }
}
