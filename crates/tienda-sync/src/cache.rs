//! # Catalog/Settings Snapshot Cache
//!
//! In-process, TTL-less cache of whole-collection snapshots.
//!
//! ## Cache Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SnapshotCache                                      │
//! │                                                                         │
//! │  get_or_refresh(key)                                                   │
//! │       │                                                                 │
//! │       ├── hit  ──► return Arc'd snapshot (no I/O)                      │
//! │       │                                                                 │
//! │       └── miss ──► take per-key flight lock                            │
//! │                    ├── somebody filled it meanwhile ──► return it      │
//! │                    └── compute from the store, swap in, return         │
//! │                                                                         │
//! │  Concurrent misses COLLAPSE INTO ONE computation: the flight lock is   │
//! │  per key, so a settings miss never blocks a products miss.             │
//! │                                                                         │
//! │  invalidate(key) evicts; idempotent (second call is a no-op).          │
//! │  refresh(key) recomputes and atomically swaps the snapshot, so         │
//! │  readers always see either the old complete value or the new one,     │
//! │  never anything in between.                                            │
//! │                                                                         │
//! │  NO EXPIRY: entries live until evicted or the process restarts. The    │
//! │  staleness poller is the ONLY path that notices out-of-band catalog    │
//! │  edits (see poller.rs).                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use tienda_core::{Product, StoreSettings};
use tienda_db::Database;

// =============================================================================
// Keys & Snapshots
// =============================================================================

/// Fixed cache keys: one per whole-collection snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The product catalog.
    Products,
    /// The per-business settings document.
    Settings,
}

impl CacheKey {
    /// Name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            CacheKey::Products => "products",
            CacheKey::Settings => "settings",
        }
    }
}

/// A cached whole-collection value. Cheap to clone (Arc inside).
#[derive(Debug, Clone)]
pub enum Snapshot {
    Products(Arc<Vec<Product>>),
    Settings(Arc<StoreSettings>),
}

impl Snapshot {
    /// Returns the product list, if this is a products snapshot.
    pub fn as_products(&self) -> Option<Arc<Vec<Product>>> {
        match self {
            Snapshot::Products(p) => Some(p.clone()),
            Snapshot::Settings(_) => None,
        }
    }

    /// Returns the settings, if this is a settings snapshot.
    pub fn as_settings(&self) -> Option<Arc<StoreSettings>> {
        match self {
            Snapshot::Products(_) => None,
            Snapshot::Settings(s) => Some(s.clone()),
        }
    }
}

// =============================================================================
// Snapshot Cache
// =============================================================================

/// Process-wide snapshot cache for the catalog and settings.
///
/// Shared by every checkout task (readers), the staleness poller (refresh)
/// and explicit flush calls (invalidate).
#[derive(Debug)]
pub struct SnapshotCache {
    db: Database,
    business_id: String,
    /// The snapshots readers see. Writes swap whole Arc'd values.
    entries: RwLock<HashMap<CacheKey, Snapshot>>,
    /// Per-key single-flight guards for misses and refreshes.
    products_flight: Mutex<()>,
    settings_flight: Mutex<()>,
    /// How many snapshot computations have run (diagnostics).
    computed: AtomicU64,
}

impl SnapshotCache {
    /// Creates a new, empty cache.
    pub fn new(db: Database, business_id: impl Into<String>) -> Self {
        SnapshotCache {
            db,
            business_id: business_id.into(),
            entries: RwLock::new(HashMap::new()),
            products_flight: Mutex::new(()),
            settings_flight: Mutex::new(()),
            computed: AtomicU64::new(0),
        }
    }

    /// Returns the cached snapshot, computing and storing it on a miss.
    ///
    /// Concurrent misses for the same key collapse into one computation;
    /// the latecomers return the winner's snapshot.
    pub async fn get_or_refresh(&self, key: CacheKey) -> SyncResult<Snapshot> {
        if let Some(snapshot) = self.peek(key) {
            return Ok(snapshot);
        }

        let _flight = self.flight(key).lock().await;

        // Double-check: the flight winner may have filled it while this
        // task waited for the lock
        if let Some(snapshot) = self.peek(key) {
            return Ok(snapshot);
        }

        let snapshot = self.compute(key).await?;
        self.install(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Recomputes a snapshot and atomically swaps it in.
    ///
    /// On failure the previous snapshot (if any) is retained: callers log
    /// the refresh failure and readers keep serving stale data.
    pub async fn refresh(&self, key: CacheKey) -> SyncResult<Snapshot> {
        let _flight = self.flight(key).lock().await;

        let snapshot = self.compute(key).await?;
        self.install(key, snapshot.clone());

        info!(key = key.name(), "Cache snapshot refreshed");
        Ok(snapshot)
    }

    /// Evicts a snapshot. Idempotent: evicting an absent key is a no-op.
    ///
    /// ## Returns
    /// Whether an entry was actually evicted.
    pub fn invalidate(&self, key: CacheKey) -> bool {
        let evicted = self
            .entries
            .write()
            .expect("cache lock poisoned")
            .remove(&key)
            .is_some();

        if evicted {
            debug!(key = key.name(), "Cache snapshot invalidated");
        }
        evicted
    }

    /// Convenience: the product catalog snapshot.
    pub async fn products(&self) -> SyncResult<Arc<Vec<Product>>> {
        let snapshot = self.get_or_refresh(CacheKey::Products).await?;
        // get_or_refresh(Products) can only hold a products snapshot
        Ok(snapshot.as_products().unwrap_or_else(|| Arc::new(Vec::new())))
    }

    /// Convenience: the settings snapshot.
    pub async fn settings(&self) -> SyncResult<Arc<StoreSettings>> {
        let snapshot = self.get_or_refresh(CacheKey::Settings).await?;
        snapshot.as_settings().ok_or(SyncError::MissingSettings {
            business_id: self.business_id.clone(),
        })
    }

    /// Number of snapshot computations so far (diagnostics and tests).
    pub fn computed_count(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    fn peek(&self, key: CacheKey) -> Option<Snapshot> {
        self.entries
            .read()
            .expect("cache lock poisoned")
            .get(&key)
            .cloned()
    }

    fn install(&self, key: CacheKey, snapshot: Snapshot) {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key, snapshot);
    }

    fn flight(&self, key: CacheKey) -> &Mutex<()> {
        match key {
            CacheKey::Products => &self.products_flight,
            CacheKey::Settings => &self.settings_flight,
        }
    }

    async fn compute(&self, key: CacheKey) -> SyncResult<Snapshot> {
        self.computed.fetch_add(1, Ordering::Relaxed);

        match key {
            CacheKey::Products => {
                let products = self.db.products().list().await?;
                debug!(count = products.len(), "Computed products snapshot");
                Ok(Snapshot::Products(Arc::new(products)))
            }
            CacheKey::Settings => {
                let settings = self
                    .db
                    .settings()
                    .get(&self.business_id)
                    .await?
                    .ok_or_else(|| SyncError::MissingSettings {
                        business_id: self.business_id.clone(),
                    })?;
                Ok(Snapshot::Settings(Arc::new(settings)))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
