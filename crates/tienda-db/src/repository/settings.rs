//! # Settings & Marker Repository
//!
//! Per-business settings and the catalog staleness marker.
//!
//! Both are read-mostly documents maintained by the outside world: settings
//! by an operator, the marker by the POS/ERP side every time it edits the
//! catalog. The poller reads the marker; the cache reads settings.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::collections;
use crate::store::DocumentStore;
use tienda_core::{CatalogMarker, StoreSettings};

/// Fixed id of the catalog marker document.
const CATALOG_MARKER_ID: &str = "catalog";

/// Repository for settings and marker documents.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    store: DocumentStore,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(store: DocumentStore) -> Self {
        SettingsRepository { store }
    }

    /// Gets a business's settings document.
    pub async fn get(&self, business_id: &str) -> DbResult<Option<StoreSettings>> {
        self.store.get(collections::SETTINGS, business_id).await
    }

    /// Inserts or replaces a settings document (seed/operator tooling).
    pub async fn upsert(&self, settings: &StoreSettings) -> DbResult<()> {
        self.store
            .put(collections::SETTINGS, &settings.business_id, settings)
            .await
    }

    /// Reads the catalog staleness marker.
    ///
    /// ## Returns
    /// `None` when the POS/ERP side has never bumped the marker.
    pub async fn read_marker(&self) -> DbResult<Option<DateTime<Utc>>> {
        let marker: Option<CatalogMarker> = self
            .store
            .get(collections::MARKERS, CATALOG_MARKER_ID)
            .await?;
        Ok(marker.map(|m| m.changed_at))
    }

    /// Writes the catalog marker.
    ///
    /// In production the marker is bumped by the POS/ERP side; this exists
    /// for the seed binary and tests.
    pub async fn bump_marker(&self, changed_at: DateTime<Utc>) -> DbResult<()> {
        debug!(changed_at = %changed_at, "Bumping catalog marker");
        self.store
            .put(
                collections::MARKERS,
                CATALOG_MARKER_ID,
                &CatalogMarker { changed_at },
            )
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        assert!(repo.get("biz-1").await.unwrap().is_none());

        let settings = StoreSettings {
            business_id: "biz-1".to_string(),
            business_name: "La Tienda".to_string(),
            pos_integration_enabled: true,
            stock_validation_enabled: true,
        };
        repo.upsert(&settings).await.unwrap();

        let loaded = repo.get("biz-1").await.unwrap().unwrap();
        assert!(loaded.pos_integration_enabled);
        assert_eq!(loaded.business_name, "La Tienda");
    }

    #[tokio::test]
    async fn test_marker_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.settings();

        assert!(repo.read_marker().await.unwrap().is_none());

        let stamp = Utc::now();
        repo.bump_marker(stamp).await.unwrap();
        assert_eq!(repo.read_marker().await.unwrap(), Some(stamp));
    }
}
