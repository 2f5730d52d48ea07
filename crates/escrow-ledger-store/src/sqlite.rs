//! SQLite implementation of the Backend trait.
//!
//! This is the persistent backend for the escrow ledger. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use escrow_ledger_core::KeyDigest;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Backend, CommitGate};

/// How long SQLite waits on a locked database file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// SQLite-based backend.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. The connection slot is emptied
/// on close.
pub struct SqliteBackend {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened sqlite backend");
        Self::init(conn)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Run a blocking operation on the connection.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(StoreError::poisoned)?;
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn digest_from_column(bytes: Vec<u8>) -> Result<KeyDigest> {
    KeyDigest::try_from(bytes.as_slice())
        .map_err(|_| StoreError::Inconsistent(format!("stored digest has {} bytes", bytes.len())))
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(
        &self,
        key: &str,
        digest: KeyDigest,
        value: &str,
        gate: CommitGate,
    ) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();

        self.with_conn(move |conn| {
            if gate.is_abandoned() {
                return Err(StoreError::Abandoned);
            }
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO kv_store (digest, value) VALUES (?1, ?2)
                 ON CONFLICT(digest) DO UPDATE SET value = excluded.value",
                params![digest.as_bytes().as_slice(), value],
            )?;
            tx.execute(
                "INSERT INTO kv_index (key, digest) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET digest = excluded.digest",
                params![key, digest.as_bytes().as_slice()],
            )?;

            // Dropping the transaction rolls it back.
            if !gate.claim() {
                tracing::debug!(key = key.as_str(), "rolling back abandoned upsert");
                return Err(StoreError::Abandoned);
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn fetch(&self, digest: &KeyDigest) -> Result<Option<String>> {
        let digest = *digest;

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE digest = ?1",
                params![digest.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn index_entry(&self, key: &str) -> Result<Option<KeyDigest>> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT digest FROM kv_index WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            bytes.map(digest_from_column).transpose()
        })
        .await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let prefix = prefix.to_string();

        self.with_conn(move |conn| {
            // Keys sort by byte order, so every match sits in one contiguous
            // run starting at the prefix itself.
            let mut stmt = conn.prepare(
                "SELECT kv_index.key, kv_store.value
                 FROM kv_index
                 LEFT JOIN kv_store ON kv_index.digest = kv_store.digest
                 WHERE kv_index.key >= ?1
                 ORDER BY kv_index.key",
            )?;
            let mut rows = stmt.query(params![prefix])?;

            let mut pairs = Vec::new();
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let value: Option<String> = row.get(1)?;
                match value {
                    Some(value) => pairs.push((key, value)),
                    None => {
                        return Err(StoreError::Inconsistent(format!(
                            "index entry {:?} has no stored value",
                            key
                        )))
                    }
                }
            }

            Ok(pairs)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(StoreError::poisoned)?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                tracing::info!("closed sqlite backend");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvStore, StoreOptions};

    async fn put(backend: &SqliteBackend, key: &str, value: &str) {
        backend
            .upsert(key, KeyDigest::of(key), value, CommitGate::new())
            .await
            .unwrap();
    }

    fn exec(backend: &SqliteBackend, sql: &str) {
        let guard = backend.conn.lock().unwrap();
        guard.as_ref().unwrap().execute_batch(sql).unwrap();
    }

    #[tokio::test]
    async fn test_upsert_and_fetch() {
        let backend = SqliteBackend::open_memory().unwrap();
        put(&backend, "ec:1", r#"{"escrow_id":1}"#).await;

        let digest = KeyDigest::of("ec:1");
        assert_eq!(
            backend.fetch(&digest).await.unwrap().as_deref(),
            Some(r#"{"escrow_id":1}"#)
        );
        assert_eq!(backend.index_entry("ec:1").await.unwrap(), Some(digest));
        assert_eq!(backend.fetch(&KeyDigest::of("ec:2")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_index_entry() {
        let backend = SqliteBackend::open_memory().unwrap();
        put(&backend, "lk:4", "first").await;
        put(&backend, "lk:4", "second").await;

        let scanned = backend.scan_prefix("lk:").await.unwrap();
        assert_eq!(scanned, vec![("lk:4".to_string(), "second".to_string())]);
    }

    #[tokio::test]
    async fn test_scan_prefix_is_ordered_and_bounded() {
        let backend = SqliteBackend::open_memory().unwrap();
        for key in ["ec:2", "rf:1", "ec:10", "ec:1", "ex:1", "ec"] {
            put(&backend, key, key).await;
        }

        let keys: Vec<_> = backend
            .scan_prefix("ec:")
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["ec:1", "ec:10", "ec:2"]);

        assert!(backend.scan_prefix("xp:").await.unwrap().is_empty());
        assert_eq!(backend.scan_prefix("").await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_failed_upsert_leaves_no_partial_write() {
        let backend = SqliteBackend::open_memory().unwrap();
        exec(
            &backend,
            "CREATE TRIGGER reject_index BEFORE INSERT ON kv_index
             WHEN NEW.key = 'ec:666'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        );

        let digest = KeyDigest::of("ec:666");
        let err = backend
            .upsert("ec:666", digest, "value", CommitGate::new())
            .await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));

        assert_eq!(backend.fetch(&digest).await.unwrap(), None);
        assert_eq!(backend.index_entry("ec:666").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_detects_dangling_index_entry() {
        let backend = SqliteBackend::open_memory().unwrap();
        put(&backend, "ec:1", "v").await;
        exec(
            &backend,
            "PRAGMA foreign_keys = OFF;
             INSERT INTO kv_index (key, digest) VALUES ('ec:2', zeroblob(32));",
        );

        let err = backend.scan_prefix("ec:").await.unwrap_err();
        assert!(matches!(err, StoreError::Inconsistent(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let backend = SqliteBackend::open(&path).unwrap();
        put(&backend, "rl:9", "released").await;
        backend.close().await.unwrap();

        let reopened = SqliteBackend::open(&path).unwrap();
        assert_eq!(
            reopened.fetch(&KeyDigest::of("rl:9")).await.unwrap().as_deref(),
            Some("released")
        );
    }

    #[tokio::test]
    async fn test_closed_backend_rejects_calls() {
        let backend = SqliteBackend::open_memory().unwrap();
        backend.close().await.unwrap();
        backend.close().await.unwrap();

        assert!(matches!(
            backend.fetch(&KeyDigest::of("ec:1")).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            backend
                .upsert("ec:1", KeyDigest::of("ec:1"), "v", CommitGate::new())
                .await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn test_timed_out_put_is_rolled_back() {
        let backend = Arc::new(SqliteBackend::open_memory().unwrap());
        let store = KvStore::new(
            backend.clone(),
            StoreOptions {
                op_timeout: Duration::from_millis(50),
                ..StoreOptions::default()
            },
        );

        // Hold the connection past the deadline so the upsert is still
        // queued when the caller gives up.
        let guard = backend.conn.lock().unwrap();
        let err = store.put("ec:1", "late").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        drop(guard);

        // Give the queued upsert time to reach its commit point.
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(backend.index_entry("ec:1").await.unwrap(), None);
        assert_eq!(backend.fetch(&KeyDigest::of("ec:1")).await.unwrap(), None);
        assert!(matches!(store.get("ec:1").await, Err(StoreError::NotFound(_))));

        store.put("ec:1", "fresh").await.unwrap();
        assert_eq!(
            backend.scan_prefix("ec:").await.unwrap(),
            vec![("ec:1".to_string(), "fresh".to_string())]
        );
    }

    #[tokio::test]
    async fn test_claimed_upsert_commits() {
        let backend = SqliteBackend::open_memory().unwrap();
        let gate = CommitGate::new();
        backend
            .upsert("rf:3", KeyDigest::of("rf:3"), "refunded", gate.clone())
            .await
            .unwrap();

        assert!(!gate.abandon());
        assert_eq!(
            backend.fetch(&KeyDigest::of("rf:3")).await.unwrap().as_deref(),
            Some("refunded")
        );
    }
}
