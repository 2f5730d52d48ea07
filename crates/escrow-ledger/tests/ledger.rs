//! End-to-end tests over both backends.

use std::sync::Arc;

use escrow_ledger::store::{ErrorKind, KvStore, StoreConfig};
use escrow_ledger::{EventKind, EventResolver, Ledger, LedgerConfig};
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One memory-backed and one file-backed ledger.
fn ledgers(dir: &tempfile::TempDir) -> Vec<Ledger> {
    vec![
        Ledger::open(LedgerConfig::default()).unwrap(),
        Ledger::open(LedgerConfig {
            store: StoreConfig::sqlite(dir.path().join("ledger.db")),
            ..LedgerConfig::default()
        })
        .unwrap(),
    ]
}

#[tokio::test]
async fn test_escrow_lifecycle() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    for ledger in ledgers(&dir) {
        let backend = ledger.store().backend_name();

        ledger
            .record(EventKind::Created, 100, &json!({ "escrow_id": 100, "amount": "250" }))
            .await
            .unwrap();
        assert_eq!(ledger.latest(100).await.unwrap().unwrap().0, EventKind::Created, "{backend}");

        ledger
            .record(EventKind::Linked, 100, &json!({ "escrow_id": 100, "shipment": "S-9" }))
            .await
            .unwrap();
        ledger
            .record(EventKind::Extended, 100, &json!({ "escrow_id": 100, "days": 7 }))
            .await
            .unwrap();
        assert_eq!(ledger.latest(100).await.unwrap().unwrap().0, EventKind::Extended, "{backend}");

        ledger
            .record(EventKind::Released, 100, &json!({ "escrow_id": 100 }))
            .await
            .unwrap();
        let (kind, payload) = ledger.latest(100).await.unwrap().unwrap();
        assert_eq!(kind, EventKind::Released, "{backend}");
        assert_eq!(payload.as_json().unwrap()["escrow_id"], 100);

        let timeline: Vec<_> = ledger
            .timeline(100)
            .await
            .unwrap()
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(
            timeline,
            vec![
                EventKind::Released,
                EventKind::Extended,
                EventKind::Linked,
                EventKind::Created
            ]
        );

        ledger.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_latest_activity_feed_ordering() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    for ledger in ledgers(&dir) {
        let store = ledger.store();
        store.put("ec:1", r#"{"escrow_id":1}"#).await.unwrap();
        store.put("rf:1", r#"{"escrow_id":1}"#).await.unwrap();
        store.put("ec:2", r#"{"escrow_id":2}"#).await.unwrap();
        store.put("rl:2", r#"{"escrow_id":2}"#).await.unwrap();
        store.put("ec:3", r#"{"escrow_id":3}"#).await.unwrap();
        store.put("ec:4", "garbage").await.unwrap();
        store.put("cn:4", "{still garbage").await.unwrap();
        store.put("ex:30", r#"{"escrow_id":30}"#).await.unwrap();
        store.put("xp:30", r#"{"escrow_id":30}"#).await.unwrap();

        let rows: Vec<_> = ledger
            .resolver()
            .scan_all(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.escrow_id, e.prefix, e.data.is_raw()))
            .collect();

        assert_eq!(
            rows,
            vec![
                (1, EventKind::Refunded, false),
                (2, EventKind::Released, false),
                (30, EventKind::Expired, false),
                (4, EventKind::Cancelled, true),
                (3, EventKind::Created, false),
            ]
        );

        let top_two = ledger.resolver().scan_all(2).await.unwrap();
        assert_eq!(top_two[0].escrow_id, 1);
        assert_eq!(top_two[1].escrow_id, 2);

        ledger.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_reopen_preserves_records() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        store: StoreConfig::sqlite(dir.path().join("persist.db")),
        ..LedgerConfig::default()
    };

    let ledger = Ledger::open(config.clone()).unwrap();
    ledger
        .record(EventKind::Cancelled, 55, &json!({ "escrow_id": 55, "reason": "buyer" }))
        .await
        .unwrap();
    ledger.close().await.unwrap();

    let reopened = Ledger::open(config).unwrap();
    let (kind, payload) = reopened.latest(55).await.unwrap().unwrap();
    assert_eq!(kind, EventKind::Cancelled);
    assert_eq!(payload.as_json().unwrap()["reason"], "buyer");
}

#[tokio::test]
async fn test_closed_ledger_rejects_reads_and_writes() {
    let ledger = Ledger::open(LedgerConfig::default()).unwrap();
    ledger.close().await.unwrap();

    let store = ledger.store();
    assert_eq!(store.get("ec:1").await.unwrap_err().kind(), ErrorKind::Storage);
    assert_eq!(store.put("ec:1", "{}").await.unwrap_err().kind(), ErrorKind::Storage);
    assert!(ledger.resolver().scan_all(5).await.unwrap_err().is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_and_feed_reader() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(KvStore::open(&StoreConfig::sqlite(dir.path().join("busy.db"))).unwrap());
    let resolver = EventResolver::new(store.clone());

    let writers: Vec<_> = (0..4u64)
        .map(|w| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                for i in 0..25u64 {
                    let id = w * 100 + i;
                    resolver
                        .record(EventKind::Created, id, &json!({ "escrow_id": id }))
                        .await
                        .unwrap();
                    if i % 5 == 0 {
                        resolver
                            .record(EventKind::Refunded, id, &json!({ "escrow_id": id }))
                            .await
                            .unwrap();
                    }
                }
            })
        })
        .collect();

    let reader = {
        let resolver = resolver.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                let rows = resolver.scan_all(1000).await.unwrap();
                // Mid-write views may be partial but are always well formed.
                let mut ids: Vec<_> = rows.iter().map(|e| e.escrow_id).collect();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), rows.len());
            }
        })
    };

    for writer in writers {
        writer.await.unwrap();
    }
    reader.await.unwrap();

    let rows = resolver.scan_all(1000).await.unwrap();
    assert_eq!(rows.len(), 100);
    let refunded = rows.iter().filter(|e| e.prefix == EventKind::Refunded).count();
    assert_eq!(refunded, 20);
    assert!(rows[..refunded].iter().all(|e| e.prefix == EventKind::Refunded));
    assert!(store.cache_stats().entry_count <= store.cache_stats().capacity);
}
