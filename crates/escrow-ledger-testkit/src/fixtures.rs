//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;

use escrow_ledger::{EntityId, EventKey, EventKind, Ledger, LedgerConfig, Result};
use escrow_ledger_store::StoreConfig;
use serde_json::{json, Value};

/// Sample escrows, as `(kind, ids)` rows in catalog order.
///
/// Every escrow starts with `ec`; the later kinds make each escrow resolve to
/// a different current state.
const SEED: &[(EventKind, &[EntityId])] = &[
    (EventKind::Created, &[1, 2, 3, 4, 5, 6]),
    (EventKind::Linked, &[1, 2, 6]),
    (EventKind::Extended, &[2]),
    (EventKind::Cancelled, &[3]),
    (EventKind::Expired, &[4]),
    (EventKind::Refunded, &[2]),
    (EventKind::Released, &[1]),
];

/// The seeded escrows as `(kind, id, payload)` triples.
pub fn seed_escrows() -> Vec<(EventKind, EntityId, Value)> {
    SEED.iter()
        .flat_map(|(kind, ids)| ids.iter().map(move |&id| (*kind, id, sample_payload(*kind, id))))
        .collect()
}

/// The latest-activity rows the seeded data resolves to, in feed order.
pub fn expected_activity() -> Vec<(EntityId, EventKind)> {
    vec![
        (2, EventKind::Refunded),
        (1, EventKind::Released),
        (4, EventKind::Expired),
        (6, EventKind::Linked),
        (3, EventKind::Cancelled),
        (5, EventKind::Created),
    ]
}

/// A plausible event payload for one escrow.
pub fn sample_payload(kind: EventKind, id: EntityId) -> Value {
    let mut payload = json!({
        "escrow_id": id,
        "event": kind.event_name(),
    });

    let extra = match kind {
        EventKind::Created => json!({
            "buyer": format!("0xb{:03}", id),
            "seller": format!("0x5{:03}", id),
            "amount": (id * 1_000).to_string(),
        }),
        EventKind::Linked => json!({ "shipment_id": format!("SHP-{:04}", id) }),
        EventKind::Extended => json!({ "extra_days": 7 }),
        EventKind::Cancelled => json!({ "reason": "buyer_request" }),
        EventKind::Expired => json!({ "expired_at": 1_700_000_000 + id }),
        EventKind::Refunded => json!({ "to": format!("0xb{:03}", id) }),
        EventKind::Released => json!({ "to": format!("0x5{:03}", id) }),
    };

    if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), extra) {
        target.extend(fields);
    }
    payload
}

/// A test fixture wrapping a ledger.
pub struct LedgerFixture {
    pub ledger: Ledger,
}

impl LedgerFixture {
    /// A fixture over an empty in-memory ledger.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// A fixture over a SQLite file at `path`.
    pub fn sqlite(path: &Path) -> Self {
        Self::with_config(LedgerConfig {
            store: StoreConfig::sqlite(path),
            ..LedgerConfig::default()
        })
    }

    /// A fixture with an explicit configuration.
    ///
    /// Panics if the store cannot be opened.
    pub fn with_config(config: LedgerConfig) -> Self {
        let ledger = Ledger::open(config).expect("failed to open fixture ledger");
        Self { ledger }
    }

    /// Record every seeded escrow event.
    pub async fn seed(&self) -> Result<Vec<EventKey>> {
        let mut keys = Vec::new();
        for (kind, id, payload) in seed_escrows() {
            keys.push(self.ledger.record(kind, id, &payload).await?);
        }
        Ok(keys)
    }

    /// Record one sample event.
    pub async fn record(&self, kind: EventKind, id: EntityId) -> Result<EventKey> {
        self.ledger.record(kind, id, &sample_payload(kind, id)).await
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}
