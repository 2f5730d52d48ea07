//! # Escrow Ledger Core
//!
//! Pure primitives for the escrow ledger: event kinds, record keys, key
//! digests, and payload decoding.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over the key and payload formats shared by the store and the resolver.
//!
//! ## Key Types
//!
//! - [`EventKind`] - The closed set of escrow lifecycle events, in priority order
//! - [`EventKey`] - A parsed `<prefix>:<entity id>` record key
//! - [`KeyDigest`] - Content address of a key (Blake3 hash)
//! - [`DecodedPayload`] - A stored record decoded as JSON, or kept raw
//!
//! ## Key Format
//!
//! Every record lives under `<2-letter prefix>:<decimal id>`, e.g. `ec:1042`.
//! See [`event`] for the prefix table.

pub mod error;
pub mod event;
pub mod payload;
pub mod types;

pub use error::{CoreError, Result};
pub use event::{EntityId, EventKey, EventKind};
pub use payload::DecodedPayload;
pub use types::KeyDigest;
