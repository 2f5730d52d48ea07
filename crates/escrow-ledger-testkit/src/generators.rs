//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};

use escrow_ledger::EntityEvents;
use escrow_ledger_core::{EntityId, EventKey, EventKind};

/// Generate an event kind.
pub fn event_kind() -> impl Strategy<Value = EventKind> {
    prop::sample::select(EventKind::ALL.to_vec())
}

/// Generate an entity id.
pub fn entity_id() -> impl Strategy<Value = EntityId> {
    any::<EntityId>()
}

/// Generate a structured event key.
pub fn event_key() -> impl Strategy<Value = EventKey> {
    (event_kind(), entity_id()).prop_map(|(kind, id)| EventKey::new(kind, id))
}

/// Generate a non-empty store key with a short alphabetic prefix.
pub fn store_key() -> impl Strategy<Value = String> {
    "[a-z]{1,3}:[a-z0-9]{0,8}".prop_map(String::from)
}

/// Generate a non-empty store value.
pub fn store_value() -> impl Strategy<Value = String> {
    "\\PC{1,64}".prop_map(String::from)
}

/// Generate a JSON object payload carrying an escrow id.
pub fn json_payload() -> impl Strategy<Value = Value> {
    (entity_id(), "[a-z ]{0,16}", any::<i64>()).prop_map(|(id, note, amount)| {
        json!({
            "escrow_id": id,
            "note": note,
            "amount": amount,
        })
    })
}

/// Generate the records of one entity: a subset of kinds with payloads.
pub fn entity_events() -> impl Strategy<Value = EntityEvents> {
    prop::collection::vec((any::<bool>(), json_payload()), EventKind::ALL.len()).prop_map(|slots| {
        EventKind::ALL
            .into_iter()
            .zip(slots)
            .filter(|(_, (present, _))| *present)
            .map(|(kind, (_, payload))| (kind, payload.to_string()))
            .collect()
    })
}
