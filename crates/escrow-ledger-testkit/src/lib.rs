//! # Escrow Ledger Testkit
//!
//! Testing utilities for the escrow ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Seeded ledgers with a known set of escrows
//! - **Generators**: Proptest strategies for keys, kinds, and payloads
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use escrow_ledger_testkit::fixtures::{expected_activity, LedgerFixture};
//!
//! async fn example() {
//!     let fixture = LedgerFixture::new();
//!     fixture.seed().await.unwrap();
//!
//!     let feed = fixture.ledger.latest_all().await.unwrap();
//!     assert_eq!(feed.len(), expected_activity().len());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use escrow_ledger::EventResolver;
//! use escrow_ledger_testkit::generators::entity_events;
//!
//! proptest! {
//!     #[test]
//!     fn latest_is_deterministic(events in entity_events()) {
//!         let a = EventResolver::pick_latest(&events).map(|(k, _)| k);
//!         let b = EventResolver::pick_latest(&events).map(|(k, _)| k);
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{expected_activity, sample_payload, seed_escrows, LedgerFixture};
pub use generators::{entity_events, event_key, event_kind, json_payload};
