//! # Staleness Poller
//!
//! Background task that detects out-of-band catalog edits.
//!
//! ## Polling Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Staleness Poller Flow                                │
//! │                                                                         │
//! │  every poll_interval (default 300 s):                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read markers/catalog (one timestamp, bumped by the POS/ERP side)      │
//! │       │                                                                 │
//! │       ├── no marker, or not newer than the one observed at the         │
//! │       │   previous successful refresh ──► nothing to do                │
//! │       │                                                                 │
//! │       └── newer ──► cache.refresh(Products)                            │
//! │                      ├── ok   → remember the new marker                │
//! │                      └── fail → log, keep the OLD marker so the next   │
//! │                                 tick tries again (stale snapshot       │
//! │                                 retained, never half-written)          │
//! │                                                                         │
//! │  The poller is the ONLY path that notices catalog edits made by the    │
//! │  POS/ERP side; the cache itself never expires products on its own.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, SnapshotCache};
use crate::error::{SyncError, SyncResult};
use tienda_db::Database;

/// Background poller comparing the upstream catalog marker against the one
/// observed at the previous successful refresh.
pub struct StalenessPoller {
    db: Database,
    cache: Arc<SnapshotCache>,
    interval: Duration,
    /// Marker value at the previous successful refresh.
    last_marker: Option<chrono::DateTime<chrono::Utc>>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the poller.
#[derive(Clone)]
pub struct StalenessPollerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl StalenessPollerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Shutdown channel closed".into()))
    }
}

impl StalenessPoller {
    /// Creates a new poller and returns a handle.
    pub fn new(
        db: Database,
        cache: Arc<SnapshotCache>,
        interval: Duration,
    ) -> (Self, StalenessPollerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let poller = StalenessPoller {
            db,
            cache,
            interval,
            last_marker: None,
            shutdown_rx,
        };

        (poller, StalenessPollerHandle { shutdown_tx })
    }

    /// Runs the poller loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Staleness poller starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; that gives
        // a warm cache right after startup
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(?e, "Staleness poll failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Staleness poller shutting down");
                    break;
                }
            }
        }

        info!("Staleness poller stopped");
    }

    /// One poll: compare the upstream marker and refresh when stale.
    ///
    /// Exposed so tests (and operator tooling) can drive a poll without
    /// waiting for the interval.
    ///
    /// ## Returns
    /// Whether a refresh ran.
    pub async fn tick(&mut self) -> SyncResult<bool> {
        let marker = self.db.settings().read_marker().await?;

        let Some(marker) = marker else {
            debug!("No catalog marker yet");
            return Ok(false);
        };

        let stale = match self.last_marker {
            None => true,
            Some(last) => marker > last,
        };

        if !stale {
            debug!(marker = %marker, "Catalog marker unchanged");
            return Ok(false);
        }

        info!(marker = %marker, "Catalog marker moved, refreshing products snapshot");

        match self.cache.refresh(CacheKey::Products).await {
            Ok(_) => {
                // Remember the marker only after a successful refresh so a
                // failure is retried on the next tick
                self.last_marker = Some(marker);
                Ok(true)
            }
            Err(e) => {
                warn!(?e, marker = %marker, "Catalog refresh failed, stale snapshot retained");
                Err(e)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use tienda_core::{Category, Product, Supplier};
    use tienda_db::DbConfig;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents: 100,
            has_iva: false,
            iva_per_unit_cents: 0,
            price_without_iva_cents: 0,
            iva_rate_bps: 0,
            stock: 10,
            category: Category::default(),
            supplier: Supplier::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn setup() -> (Database, Arc<SnapshotCache>, StalenessPoller) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().upsert(&product("p1")).await.unwrap();

        let cache = Arc::new(SnapshotCache::new(db.clone(), "biz-1"));
        let (poller, _handle) = StalenessPoller::new(db.clone(), cache.clone(), Duration::from_secs(300));
        (db, cache, poller)
    }

    #[tokio::test]
    async fn test_no_marker_no_refresh() {
        let (_db, cache, mut poller) = setup().await;
        assert!(!poller.tick().await.unwrap());
        assert_eq!(cache.computed_count(), 0);
    }

    #[tokio::test]
    async fn test_newer_marker_forces_refresh() {
        let (db, cache, mut poller) = setup().await;

        // Readers warm the cache
        assert_eq!(cache.products().await.unwrap().len(), 1);

        // First marker observation refreshes
        let t0 = Utc::now();
        db.settings().bump_marker(t0).await.unwrap();
        assert!(poller.tick().await.unwrap());

        // Same marker: nothing to do
        assert!(!poller.tick().await.unwrap());

        // Out-of-band catalog edit + marker bump
        db.products().upsert(&product("p2")).await.unwrap();
        db.settings()
            .bump_marker(t0 + ChronoDuration::seconds(60))
            .await
            .unwrap();

        assert!(poller.tick().await.unwrap());

        // The next read sees a snapshot computed AFTER the observation
        assert_eq!(cache.products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_older_marker_is_ignored() {
        let (db, _cache, mut poller) = setup().await;

        let t0 = Utc::now();
        db.settings().bump_marker(t0).await.unwrap();
        assert!(poller.tick().await.unwrap());

        // Marker moves backwards (clock skew upstream): not "newer", so no refresh
        db.settings()
            .bump_marker(t0 - ChronoDuration::seconds(60))
            .await
            .unwrap();
        assert!(!poller.tick().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_and_shutdown() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = Arc::new(SnapshotCache::new(db.clone(), "biz-1"));
        let (poller, handle) =
            StalenessPoller::new(db, cache, Duration::from_millis(10));

        let task = tokio::spawn(poller.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }
}
