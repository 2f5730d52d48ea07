//! The Ledger: unified API for the escrow ledger.
//!
//! The Ledger brings together the key-value store, the event resolver,
//! and the activity feed behind one handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use escrow_ledger_core::{DecodedPayload, EntityId, EventKey, EventKind};
use escrow_ledger_store::{KvStore, StoreConfig};

use crate::error::Result;
use crate::feed::{ActivityFeed, FeedConfig, FeedHandle};
use crate::resolver::{ActivityEntry, EventResolver};

/// Configuration for the Ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Storage configuration.
    pub store: StoreConfig,
    /// Activity feed configuration.
    pub feed: FeedConfig,
}

impl LedgerConfig {
    /// Storage settings from the environment, feed defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            feed: FeedConfig::default(),
        })
    }
}

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Recording escrow events
/// - Resolving the current state of one escrow
/// - Computing and publishing the latest-activity feed
pub struct Ledger {
    /// The shared store.
    store: Arc<KvStore>,
    /// Resolver over the same store.
    resolver: EventResolver,
    /// Configuration.
    config: LedgerConfig,
}

impl Ledger {
    /// Open the store described by `config`.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        config.feed.validate()?;
        let store = KvStore::open(&config.store)?;
        Self::new(store, config)
    }

    /// Create a ledger over an already-open store.
    pub fn new(store: KvStore, config: LedgerConfig) -> Result<Self> {
        config.feed.validate()?;
        let store = Arc::new(store);
        Ok(Self {
            resolver: EventResolver::new(store.clone()),
            store,
            config,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    pub fn resolver(&self) -> &EventResolver {
        &self.resolver
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Record an event payload for an escrow.
    pub async fn record<T>(&self, kind: EventKind, entity_id: EntityId, payload: &T) -> Result<EventKey>
    where
        T: Serialize + ?Sized,
    {
        self.resolver.record(kind, entity_id, payload).await
    }

    /// Current state of one escrow.
    pub async fn latest(&self, entity_id: EntityId) -> Result<Option<(EventKind, DecodedPayload)>> {
        self.resolver.latest(entity_id).await
    }

    /// All records of one escrow, most authoritative first.
    pub async fn timeline(&self, entity_id: EntityId) -> Result<Vec<(EventKind, DecodedPayload)>> {
        self.resolver.timeline(entity_id).await
    }

    /// The latest-activity view, capped at the configured feed limit.
    pub async fn latest_all(&self) -> Result<Vec<ActivityEntry>> {
        self.resolver.scan_all(self.config.feed.limit).await
    }

    /// Start the background activity feed.
    pub fn spawn_feed(&self) -> Result<FeedHandle> {
        ActivityFeed::spawn(self.resolver.clone(), self.config.feed.clone())
    }

    /// Close the store. Running feeds stop on their next tick.
    pub async fn close(&self) -> Result<()> {
        Ok(self.store.close().await?)
    }
}
