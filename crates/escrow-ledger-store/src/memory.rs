//! In-memory implementation of the Backend trait.
//!
//! It has the same semantics as SQLite but keeps everything in memory with
//! no persistence. Used for tests and ephemeral deployments.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use escrow_ledger_core::KeyDigest;

use crate::error::{Result, StoreError};
use crate::traits::{Backend, CommitGate};

/// In-memory backend.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock;
/// an upsert holds the write lock across both tables.
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

struct MemoryBackendInner {
    /// Primary table: digest -> value.
    primary: HashMap<KeyDigest, String>,

    /// Index: literal key -> digest, ordered for range scans.
    index: BTreeMap<String, KeyDigest>,

    closed: bool,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner {
                primary: HashMap::new(),
                index: BTreeMap::new(),
                closed: false,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryBackendInner>> {
        let inner = self.inner.read().map_err(StoreError::poisoned)?;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        Ok(inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryBackendInner>> {
        let inner = self.inner.write().map_err(StoreError::poisoned)?;
        if inner.closed {
            return Err(StoreError::Closed);
        }
        Ok(inner)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(
        &self,
        key: &str,
        digest: KeyDigest,
        value: &str,
        gate: CommitGate,
    ) -> Result<()> {
        let mut inner = self.write()?;
        if !gate.claim() {
            return Err(StoreError::Abandoned);
        }
        inner.primary.insert(digest, value.to_string());
        inner.index.insert(key.to_string(), digest);
        Ok(())
    }

    async fn fetch(&self, digest: &KeyDigest) -> Result<Option<String>> {
        let inner = self.read()?;
        Ok(inner.primary.get(digest).cloned())
    }

    async fn index_entry(&self, key: &str) -> Result<Option<KeyDigest>> {
        let inner = self.read()?;
        Ok(inner.index.get(key).copied())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let inner = self.read()?;

        inner
            .index
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, digest)| match inner.primary.get(digest) {
                Some(value) => Ok((key.clone(), value.clone())),
                None => Err(StoreError::Inconsistent(format!(
                    "index entry {key:?} points at missing digest {digest}"
                ))),
            })
            .collect()
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().map_err(StoreError::poisoned)?;
        inner.primary.clear();
        inner.index.clear();
        inner.closed = true;
        Ok(())
    }
}
