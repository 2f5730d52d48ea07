//! Event kinds and record keys.
//!
//! Each escrow lifecycle event owns a distinct two-letter prefix. A record is
//! stored under `<prefix>:<entity id>`, so event types never collide and every
//! (kind, entity) pair has at most one live record.
//!
//! | Prefix | Event             |
//! |--------|-------------------|
//! | `rf`   | `FundsRefunded`   |
//! | `rl`   | `FundsReleased`   |
//! | `xp`   | `EscrowExpired`   |
//! | `ex`   | `EscrowExtended`  |
//! | `lk`   | `ShipmentLinked`  |
//! | `cn`   | `EscrowCancelled` |
//! | `ec`   | `EscrowCreated`   |
//!
//! The table is listed in resolution priority order. Adding a kind is a
//! contract change, not configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Identifier of one escrow. Entities are never stored on their own; they are
/// inferred by grouping records that share the same id segment.
pub type EntityId = u64;

/// Separator between prefix and entity id.
pub const KEY_SEPARATOR: char = ':';

/// The escrow lifecycle events.
///
/// Variants are declared in priority order, most authoritative first, so the
/// derived `Ord` is the resolution order: `Refunded < Released < ... < Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "rf")]
    Refunded,
    #[serde(rename = "rl")]
    Released,
    #[serde(rename = "xp")]
    Expired,
    #[serde(rename = "ex")]
    Extended,
    #[serde(rename = "lk")]
    Linked,
    #[serde(rename = "cn")]
    Cancelled,
    #[serde(rename = "ec")]
    Created,
}

impl EventKind {
    /// All kinds in catalog order (the order producers emit them).
    pub const ALL: [EventKind; 7] = [
        EventKind::Created,
        EventKind::Linked,
        EventKind::Extended,
        EventKind::Cancelled,
        EventKind::Expired,
        EventKind::Refunded,
        EventKind::Released,
    ];

    /// All kinds in resolution priority order, most authoritative first.
    ///
    /// The placement of `Expired` and `Extended` ahead of `Cancelled` is
    /// load-bearing for existing dashboards and must not be reordered.
    pub const PRIORITY: [EventKind; 7] = [
        EventKind::Refunded,
        EventKind::Released,
        EventKind::Expired,
        EventKind::Extended,
        EventKind::Linked,
        EventKind::Cancelled,
        EventKind::Created,
    ];

    /// The two-letter key prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            EventKind::Refunded => "rf",
            EventKind::Released => "rl",
            EventKind::Expired => "xp",
            EventKind::Extended => "ex",
            EventKind::Linked => "lk",
            EventKind::Cancelled => "cn",
            EventKind::Created => "ec",
        }
    }

    /// The producer-side event name.
    pub const fn event_name(self) -> &'static str {
        match self {
            EventKind::Refunded => "FundsRefunded",
            EventKind::Released => "FundsReleased",
            EventKind::Expired => "EscrowExpired",
            EventKind::Extended => "EscrowExtended",
            EventKind::Linked => "ShipmentLinked",
            EventKind::Cancelled => "EscrowCancelled",
            EventKind::Created => "EscrowCreated",
        }
    }

    /// Position in [`EventKind::PRIORITY`]; lower wins.
    pub const fn rank(self) -> usize {
        self as usize
    }

    /// Whether this kind is a final financial outcome.
    pub const fn is_terminal(self) -> bool {
        matches!(self, EventKind::Refunded | EventKind::Released)
    }

    /// Look up a kind by its two-letter prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// The key prefix including the separator, e.g. `"rf:"`, for range scans.
    pub fn scan_prefix(self) -> String {
        format!("{}{}", self.prefix(), KEY_SEPARATOR)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_prefix(s).ok_or_else(|| CoreError::UnknownPrefix(s.to_string()))
    }
}

/// A structured record key: `<prefix>:<entity id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub kind: EventKind,
    pub entity_id: EntityId,
}

impl EventKey {
    /// Create a key for one event of one entity.
    pub const fn new(kind: EventKind, entity_id: EntityId) -> Self {
        Self { kind, entity_id }
    }

    /// Parse a literal key.
    ///
    /// The id segment must be a non-empty run of ASCII digits that fits in a
    /// `u64`; signs, whitespace, and extra separators are rejected.
    pub fn parse(key: &str) -> Result<Self> {
        let (prefix, id) = key
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| malformed(key, "missing separator"))?;

        let kind = EventKind::from_prefix(prefix)
            .ok_or_else(|| CoreError::UnknownPrefix(prefix.to_string()))?;

        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(key, "entity id is not a decimal integer"));
        }
        let entity_id = id
            .parse::<EntityId>()
            .map_err(|_| malformed(key, "entity id out of range"))?;

        Ok(Self { kind, entity_id })
    }
}

fn malformed(key: &str, reason: &'static str) -> CoreError {
    CoreError::MalformedKey {
        key: key.to_string(),
        reason,
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind.prefix(), KEY_SEPARATOR, self.entity_id)
    }
}

impl FromStr for EventKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
