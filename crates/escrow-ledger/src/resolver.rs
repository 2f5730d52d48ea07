//! EventResolver: picks the record that represents an escrow's current state.
//!
//! The store keeps every event kind of an escrow independently, so several
//! records may coexist for one entity. Resolution is a fixed priority walk
//! over [`EventKind::PRIORITY`]; it never validates transitions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use escrow_ledger_core::{DecodedPayload, EntityId, EventKey, EventKind};
use escrow_ledger_store::KvStore;

use crate::error::Result;

/// Raw stored records of one entity, keyed by event kind.
///
/// Iteration order is priority order, since `EventKind`'s `Ord` is the
/// resolution order.
pub type EntityEvents = BTreeMap<EventKind, String>;

/// One row of the latest-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// The escrow this row describes.
    pub escrow_id: EntityId,
    /// The event kind that won resolution.
    pub prefix: EventKind,
    /// Event name of the winning kind.
    pub event: &'static str,
    /// Decoded payload of the winning record.
    pub data: DecodedPayload,
}

impl ActivityEntry {
    pub fn new(escrow_id: EntityId, kind: EventKind, data: DecodedPayload) -> Self {
        Self {
            escrow_id,
            prefix: kind,
            event: kind.event_name(),
            data,
        }
    }
}

/// Read-side resolver over a shared [`KvStore`].
#[derive(Clone)]
pub struct EventResolver {
    store: Arc<KvStore>,
}

impl EventResolver {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Serialize `payload` as JSON and store it under `kind:entity_id`.
    pub async fn record<T>(&self, kind: EventKind, entity_id: EntityId, payload: &T) -> Result<EventKey>
    where
        T: Serialize + ?Sized,
    {
        let key = EventKey::new(kind, entity_id);
        let value = DecodedPayload::encode(payload)?;
        self.store.put(&key.to_string(), &value).await?;
        tracing::debug!(%key, "recorded event");
        Ok(key)
    }

    /// Collect every stored record of one entity.
    ///
    /// A missing kind is normal and simply absent from the map. Backend
    /// failures are returned.
    pub async fn resolve_entity(&self, entity_id: EntityId) -> Result<EntityEvents> {
        let mut events = EntityEvents::new();

        for kind in EventKind::ALL {
            let key = EventKey::new(kind, entity_id).to_string();
            match self.store.get(&key).await {
                Ok(value) => {
                    events.insert(kind, value);
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(events)
    }

    /// Pick the most authoritative record of an entity and decode it.
    ///
    /// Undecodable payloads come back as [`DecodedPayload::Raw`].
    pub fn pick_latest(events: &EntityEvents) -> Option<(EventKind, DecodedPayload)> {
        EventKind::PRIORITY.iter().find_map(|kind| {
            events
                .get(kind)
                .map(|raw| (*kind, DecodedPayload::decode(raw)))
        })
    }

    /// The current state of one entity, if it has any records.
    pub async fn latest(&self, entity_id: EntityId) -> Result<Option<(EventKind, DecodedPayload)>> {
        let events = self.resolve_entity(entity_id).await?;
        Ok(Self::pick_latest(&events))
    }

    /// Every record of one entity, decoded, most authoritative first.
    pub async fn timeline(&self, entity_id: EntityId) -> Result<Vec<(EventKind, DecodedPayload)>> {
        let events = self.resolve_entity(entity_id).await?;
        Ok(events
            .iter()
            .map(|(kind, raw)| (*kind, DecodedPayload::decode(raw)))
            .collect())
    }

    /// The latest-activity feed: one row per entity, most authoritative kinds
    /// first, newest ids first within a kind, at most `limit` rows.
    ///
    /// Each prefix is scanned once; keys whose id segment does not parse are
    /// skipped. Scans of different prefixes are not one snapshot.
    pub async fn scan_all(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let mut buckets: HashMap<EntityId, EntityEvents> = HashMap::new();

        for kind in EventKind::ALL {
            for (key, value) in self.store.iterate(&kind.scan_prefix()).await? {
                match EventKey::parse(&key) {
                    Ok(parsed) if parsed.kind == kind => {
                        buckets
                            .entry(parsed.entity_id)
                            .or_default()
                            .insert(kind, value);
                    }
                    _ => tracing::warn!(key = key.as_str(), "skipping malformed event key"),
                }
            }
        }

        let mut entries: Vec<ActivityEntry> = buckets
            .into_iter()
            .filter_map(|(entity_id, events)| {
                Self::pick_latest(&events)
                    .map(|(kind, data)| ActivityEntry::new(entity_id, kind, data))
            })
            .collect();

        entries.sort_by(|a, b| {
            a.prefix
                .rank()
                .cmp(&b.prefix.rank())
                .then_with(|| b.escrow_id.cmp(&a.escrow_id))
        });
        entries.truncate(limit);

        Ok(entries)
    }
}
