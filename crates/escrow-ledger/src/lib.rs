//! # Escrow Ledger
//!
//! The unified API for tracking escrow lifecycle events and resolving each
//! escrow's current state.
//!
//! ## Overview
//!
//! Producers record one JSON payload per (event kind, escrow id). The ledger
//! keeps every kind independently and resolves, at read time, which record
//! represents an escrow's current state:
//!
//! - **Record**: store an event under `<prefix>:<id>`
//! - **Resolve**: pick the most authoritative record of one escrow
//! - **Feed**: one row per escrow across the whole store, sorted for display
//!
//! ## Resolution Order
//!
//! Most authoritative first: refunded, released, expired, extended, linked,
//! cancelled, created. See [`EventKind::PRIORITY`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use escrow_ledger::{EventKind, Ledger, LedgerConfig};
//! use escrow_ledger::store::StoreConfig;
//!
//! async fn example() {
//!     let config = LedgerConfig {
//!         store: StoreConfig::sqlite("ledger.db"),
//!         ..LedgerConfig::default()
//!     };
//!     let ledger = Ledger::open(config).unwrap();
//!
//!     ledger
//!         .record(EventKind::Created, 1042, &serde_json::json!({ "escrow_id": 1042 }))
//!         .await
//!         .unwrap();
//!
//!     let current = ledger.latest(1042).await.unwrap();
//!     let feed = ledger.spawn_feed().unwrap();
//!     let snapshot = feed.latest();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `escrow_ledger::core` - Event kinds, keys, digests, payloads
//! - `escrow_ledger::store` - Key-value store, cache, backends

pub mod error;
pub mod feed;
pub mod ledger;
pub mod resolver;

// Re-export component crates
pub use escrow_ledger_core as core;
pub use escrow_ledger_store as store;

// Re-export main types for convenience
pub use error::{LedgerError, Result};
pub use feed::{ActivityFeed, FeedConfig, FeedHandle, Snapshot};
pub use ledger::{Ledger, LedgerConfig};
pub use resolver::{ActivityEntry, EntityEvents, EventResolver};

// Re-export commonly used core types
pub use escrow_ledger_core::{DecodedPayload, EntityId, EventKey, EventKind, KeyDigest};
