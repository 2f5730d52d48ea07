//! Store configuration and backend selection.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{Result, StoreError};

/// Default deadline for a single backend call.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable selecting the backend (`memory` or `sqlite`).
pub const ENV_BACKEND: &str = "ESCROW_DB_BACKEND";
/// Environment variable holding the SQLite file path.
pub const ENV_PATH: &str = "ESCROW_DB_PATH";
/// Environment variable overriding the cache capacity.
pub const ENV_CACHE_CAPACITY: &str = "ESCROW_CACHE_CAPACITY";
/// Environment variable overriding the backend call deadline, in milliseconds.
pub const ENV_OP_TIMEOUT_MS: &str = "ESCROW_OP_TIMEOUT_MS";

/// Which storage engine backs a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local maps; nothing persists.
    #[default]
    Memory,
    /// SQLite file, or an in-memory SQLite database when no path is set.
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(StoreError::Config(format!("unknown backend {:?}", other))),
        }
    }
}

/// Configuration for a [`KvStore`](crate::KvStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage engine.
    pub backend: BackendKind,
    /// SQLite database file. Ignored by the memory backend.
    pub path: Option<PathBuf>,
    /// Maximum number of cached point lookups.
    pub cache_capacity: usize,
    /// Deadline for each backend call.
    #[serde(with = "duration_millis", rename = "op_timeout_ms")]
    pub op_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A SQLite-backed config stored at `path`.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Build a config from the process environment.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup(ENV_BACKEND) {
            config.backend = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_PATH).filter(|p| !p.is_empty()) {
            config.path = Some(PathBuf::from(path));
        }
        if let Some(capacity) = lookup(ENV_CACHE_CAPACITY) {
            config.cache_capacity = parse_number(ENV_CACHE_CAPACITY, &capacity)?;
        }
        if let Some(ms) = lookup(ENV_OP_TIMEOUT_MS) {
            let ms: u64 = parse_number(ENV_OP_TIMEOUT_MS, &ms)?;
            config.op_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no store can run with.
    ///
    /// Deserialized configs skip the environment checks, so
    /// [`KvStore::open`](crate::KvStore::open) calls this too.
    pub fn validate(&self) -> Result<()> {
        if self.op_timeout.is_zero() {
            return Err(StoreError::Config(
                "op_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| StoreError::Config(format!("{} is not a valid number: {:?}", name, raw)))
}

/// Serde adapter storing a `Duration` as whole milliseconds.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
