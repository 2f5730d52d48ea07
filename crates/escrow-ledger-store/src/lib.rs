//! # Escrow Ledger Store
//!
//! Storage abstraction for the escrow ledger. Provides a key-value store with
//! a digest-addressed primary table, an ordered key index for prefix scans,
//! and a bounded FIFO cache for point lookups.
//!
//! ## Overview
//!
//! [`KvStore`] is the entry point. It owns one [`Backend`] (chosen by
//! [`StoreConfig`]) and a [`FifoCache`]. The backends are [`SqliteBackend`]
//! for persistence and [`MemoryBackend`] for tests and ephemeral use.
//!
//! ## Key Types
//!
//! - [`KvStore`] - put / get / iterate / close
//! - [`Backend`] - The async trait implemented by storage engines
//! - [`FifoCache`] - Insertion-order bounded cache
//! - [`StoreConfig`] - Backend selection, cache capacity, call deadline
//! - [`StoreError`] - Errors, classified by [`ErrorKind`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use escrow_ledger_store::{KvStore, StoreConfig};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = KvStore::open(&StoreConfig::sqlite("ledger.db")).unwrap();
//!
//!     // Or use an in-memory store for testing
//!     let store = KvStore::memory();
//!
//!     store.put("ec:1042", r#"{"escrow_id":1042}"#).await.unwrap();
//!     let value = store.get("ec:1042").await.unwrap();
//!     let created = store.iterate("ec:").await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Digest indirection**: values live under Blake3(key); the index maps the
//!   literal key to that digest. Range queries run on the literal keys.
//! - **Atomic writes**: index and value are upserted in one backend transaction.
//! - **FIFO, not LRU**: reads never extend a cache entry's lifetime.
//! - **Deadlines**: every backend call is bounded; expiry is a storage error.

pub mod cache;
pub mod config;
pub mod error;
pub mod kv;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use cache::{CacheStats, FifoCache, DEFAULT_CACHE_CAPACITY};
pub use config::{BackendKind, StoreConfig, DEFAULT_OP_TIMEOUT};
pub use error::{ErrorKind, Result, StoreError};
pub use kv::{DigestFn, KvStore, StoreOptions};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{Backend, CommitGate};
