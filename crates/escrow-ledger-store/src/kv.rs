//! KvStore: the key-value store used by the ledger.
//!
//! Wraps a [`Backend`] with argument validation, key digesting, a FIFO cache
//! for point lookups, per-call deadlines, and a closed flag.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use escrow_ledger_core::KeyDigest;
use tokio::sync::Mutex;

use crate::cache::{CacheStats, FifoCache, DEFAULT_CACHE_CAPACITY};
use crate::config::{BackendKind, StoreConfig, DEFAULT_OP_TIMEOUT};
use crate::error::{Result, StoreError};
use crate::memory::MemoryBackend;
use crate::sqlite::SqliteBackend;
use crate::traits::{Backend, CommitGate};

/// Function mapping a literal key to its storage address.
pub type DigestFn = fn(&str) -> KeyDigest;

/// Construction-time options for a [`KvStore`].
#[derive(Clone, Copy)]
pub struct StoreOptions {
    pub cache_capacity: usize,
    pub op_timeout: Duration,
    pub digest: DigestFn,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            op_timeout: DEFAULT_OP_TIMEOUT,
            digest: KeyDigest::of,
        }
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            cache_capacity: config.cache_capacity,
            op_timeout: config.op_timeout,
            ..Self::default()
        }
    }
}

/// Key-value store with a digest-addressed primary table, an ordered key
/// index, and a FIFO read cache.
///
/// Share it behind an `Arc`; every method takes `&self`.
///
/// # Guarantees
///
/// - `put` writes index and primary table atomically, then refreshes the cache.
///   Puts are serialized, so cache and backend apply them in the same order.
/// - A `put` that fails with [`StoreError::Timeout`] has written nothing.
/// - `get` serves cache hits without touching the backend. A miss fills the
///   cache only if no put started while the backend was being read.
/// - `iterate` always reads the backend, never the cache.
/// - After `close`, every call fails with [`StoreError::Closed`].
pub struct KvStore {
    backend: Arc<dyn Backend>,
    cache: FifoCache,
    op_timeout: Duration,
    digest: DigestFn,
    closed: AtomicBool,
    /// Held across a put's backend write and cache update, and across a
    /// miss's cache fill.
    writer: Mutex<()>,
    /// Bumped by every put; a miss fill is dropped if it moved.
    generation: AtomicU64,
}

impl KvStore {
    /// Wrap an already-open backend.
    pub fn new(backend: Arc<dyn Backend>, options: StoreOptions) -> Self {
        Self {
            backend,
            cache: FifoCache::new(options.cache_capacity),
            op_timeout: options.op_timeout,
            digest: options.digest,
            closed: AtomicBool::new(false),
            writer: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Open the backend selected by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::Sqlite => match &config.path {
                Some(path) => Arc::new(SqliteBackend::open(path)?),
                None => Arc::new(SqliteBackend::open_memory()?),
            },
        };
        tracing::info!(
            backend = backend.name(),
            cache_capacity = config.cache_capacity,
            "opened kv store"
        );
        Ok(Self::new(backend, StoreOptions::from(config)))
    }

    /// An in-memory store with default options.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), StoreOptions::default())
    }

    /// Name of the backing engine.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key can't be empty"));
        }
        if value.is_empty() {
            return Err(StoreError::InvalidArgument("value can't be empty"));
        }

        let digest = (self.digest)(key);
        let _writer = self.writer.lock().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.commit(key, digest, value).await?;
        self.cache.set(key, value);
        Ok(())
    }

    /// Get the value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<String> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key can't be empty"));
        }

        if let Some(value) = self.cache.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let digest = (self.digest)(key);
        let generation = self.generation.load(Ordering::Acquire);
        match self.deadline(self.backend.fetch(&digest)).await? {
            Some(value) => {
                let _writer = self.writer.lock().await;
                if self.generation.load(Ordering::Acquire) == generation {
                    self.cache.set_if_absent(key, &value);
                }
                Ok(value)
            }
            None => {
                tracing::debug!(key, "key not found");
                Err(StoreError::NotFound(key.to_string()))
            }
        }
    }

    /// Get all `(key, value)` pairs whose key starts with `prefix`, ordered
    /// by key. Bypasses the cache.
    pub async fn iterate(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        self.ensure_open()?;
        self.deadline(self.backend.scan_prefix(prefix)).await
    }

    /// The digest the index currently holds for `key`, if any.
    pub async fn index_entry(&self, key: &str) -> Result<Option<KeyDigest>> {
        self.ensure_open()?;
        self.deadline(self.backend.index_entry(key)).await
    }

    /// Release the backend and clear the cache. Closing twice is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cache.clear();
        self.deadline(self.backend.close()).await?;
        tracing::info!(backend = self.backend.name(), "closed kv store");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Run the backend upsert under the deadline.
    ///
    /// On expiry the commit gate is abandoned. If the backend claimed it
    /// first, the commit is already under way and its outcome is awaited.
    async fn commit(&self, key: &str, digest: KeyDigest, value: &str) -> Result<()> {
        let gate = CommitGate::new();
        let mut upsert = self.backend.upsert(key, digest, value, gate.clone());

        match tokio::time::timeout(self.op_timeout, &mut upsert).await {
            Ok(result) => result,
            Err(_) if gate.abandon() => Err(StoreError::Timeout(self.op_timeout)),
            Err(_) => upsert.await,
        }
    }

    async fn deadline<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout))?
    }
}
