//! ActivityFeed: periodic recomputation of the latest-activity view.
//!
//! A background task calls [`EventResolver::scan_all`] on a fixed interval
//! and publishes each result on a `watch` channel. Presentation layers
//! subscribe and render or stream whatever snapshot is current; they never
//! query the store themselves.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{LedgerError, Result};
use crate::resolver::{ActivityEntry, EventResolver};

/// One published view of the feed.
pub type Snapshot = Arc<Vec<ActivityEntry>>;

/// Configuration for the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Time between recomputations.
    #[serde(with = "escrow_ledger_store::config::duration_millis", rename = "interval_ms")]
    pub interval: Duration,
    /// Maximum rows per snapshot.
    pub limit: usize,
}

impl FeedConfig {
    /// Reject a zero interval, which the ticker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(LedgerError::Config(
                "feed interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            limit: 50,
        }
    }
}

/// Spawner for the feed task.
pub struct ActivityFeed;

impl ActivityFeed {
    /// Start recomputing on the current tokio runtime.
    ///
    /// The first snapshot is computed immediately. A failed recomputation is
    /// logged and the previous snapshot stays published; the task stops once
    /// the store is closed or the handle is dropped.
    ///
    /// Fails with [`LedgerError::Config`] if `config` does not validate.
    pub fn spawn(resolver: EventResolver, config: FeedConfig) -> Result<FeedHandle> {
        config.validate()?;
        let (sender, receiver) = watch::channel(Snapshot::default());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match resolver.scan_all(config.limit).await {
                    Ok(entries) => {
                        if sender.send(Arc::new(entries)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.is_closed() => {
                        tracing::info!("store closed, stopping activity feed");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "activity feed recomputation failed");
                    }
                }
            }
        });

        Ok(FeedHandle { receiver, task })
    }
}

/// Handle to a running feed. Dropping it stops the task.
pub struct FeedHandle {
    receiver: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// A new receiver observing every future snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.receiver.clone()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the background task.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
