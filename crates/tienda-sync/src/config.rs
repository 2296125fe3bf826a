//! # Sync Configuration
//!
//! Process-level configuration for the sync layer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Split                                  │
//! │                                                                         │
//! │  TOML file (this module)            Settings document (tienda-db)      │
//! │  ───────────────────────            ──────────────────────────────     │
//! │  Which business this process        Business behavior flags:           │
//! │  serves, poller cadence,            pos_integration_enabled,           │
//! │  reconciliation cadence/limits      stock_validation_enabled           │
//! │                                                                         │
//! │  Read once at startup               Read through the snapshot cache,   │
//! │                                     editable at runtime by operators   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tienda-sync.toml
//! [business]
//! id = "00000000-0000-0000-0000-000000000001"
//! name = "La Tienda"
//!
//! [cache]
//! poll_interval_secs = 300   # staleness poller cadence (5 minutes)
//!
//! [reconcile]
//! poll_interval_secs = 30
//! batch_size = 100
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use tienda_core::DEFAULT_BUSINESS_ID;

// =============================================================================
// Business Configuration
// =============================================================================

/// Which business this process serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// Business identifier; also the mirror-path prefix.
    #[serde(default = "default_business_id")]
    pub id: String,

    /// Human-readable name, used only in logs.
    #[serde(default)]
    pub name: String,
}

fn default_business_id() -> String {
    DEFAULT_BUSINESS_ID.to_string()
}

impl Default for BusinessConfig {
    fn default() -> Self {
        BusinessConfig {
            id: default_business_id(),
            name: String::new(),
        }
    }
}

// =============================================================================
// Cache / Poller Settings
// =============================================================================

/// Staleness poller cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds between marker reads. Default: 300 (5 minutes).
    #[serde(default = "default_cache_interval")]
    pub poll_interval_secs: u64,
}

fn default_cache_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            poll_interval_secs: default_cache_interval(),
        }
    }
}

// =============================================================================
// Reconciliation Settings
// =============================================================================

/// Reconciliation worker behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Seconds between outbox polls. Default: 30.
    #[serde(default = "default_reconcile_interval")]
    pub poll_interval_secs: u64,

    /// Maximum entries replayed per poll. Default: 100.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Attempts before an entry is skipped and left for operators.
    /// Default: 10.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

fn default_reconcile_interval() -> u64 {
    30
}

fn default_batch_size() -> u32 {
    100
}

fn default_max_attempts() -> i64 {
    10
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            poll_interval_secs: default_reconcile_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Complete sync-layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub business: BusinessConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl SyncConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Missing sections and fields fall back to defaults, so an empty file
    /// is a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading sync configuration");

        let raw = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&raw)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        info!(
            business_id = %config.business.id,
            cache_interval = config.cache.poll_interval_secs,
            "Sync configuration loaded"
        );

        Ok(config)
    }

    /// Loads configuration from a file if it exists, otherwise defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No sync configuration file, using defaults");
            Ok(SyncConfig::default())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
