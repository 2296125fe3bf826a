//! # Stock Ledger Repository
//!
//! Persistence for per-product stock ledgers with optimistic concurrency.
//!
//! ## The Decrement Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Two Checkouts, One Product                                 │
//! │                                                                         │
//! │  Checkout A                         Checkout B                         │
//! │  ──────────                         ──────────                         │
//! │  read ledger (qty 1, v3)            read ledger (qty 1, v3)            │
//! │  add_outgoing(1) → qty 0            add_outgoing(1) → qty 0            │
//! │  save(expected v3) ✔ → v4           save(expected v3) ✘ CONFLICT       │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                     re-read (qty 0, v4)                │
//! │                                     re-validate availability           │
//! │                                     → shortfall, movement NOT applied  │
//! │                                                                         │
//! │  Without the version check both saves would land and one unit would    │
//! │  be sold twice. The CAS turns the race into a retry loop that          │
//! │  re-checks availability at mutation time, not only at the earlier      │
//! │  stock-check step.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::collections;
use crate::store::DocumentStore;
use tienda_core::StockItem;

/// Repository for stock ledger operations.
#[derive(Debug, Clone)]
pub struct StockLedgerRepository {
    store: DocumentStore,
}

impl StockLedgerRepository {
    /// Creates a new StockLedgerRepository.
    pub fn new(store: DocumentStore) -> Self {
        StockLedgerRepository { store }
    }

    /// Gets a product's ledger, with its version synced from the store.
    ///
    /// ## Returns
    /// `None` when the product has never had a movement: ledgers are
    /// created lazily by the first writer (see `StockItem::seed`).
    pub async fn get(&self, product_id: &str) -> DbResult<Option<StockItem>> {
        let loaded: Option<(StockItem, i64)> = self
            .store
            .get_versioned(collections::STOCK_ITEMS, product_id)
            .await?;

        Ok(loaded.map(|(mut item, version)| {
            // The store column is authoritative for the CAS token
            item.version = version;
            item
        }))
    }

    /// Saves a ledger with a compare-and-swap on its version.
    ///
    /// ## Semantics
    /// - `item.version` is the version the caller read (0 for a fresh
    ///   seed that was never stored)
    /// - On success the item's version is bumped to the stored one
    /// - On `VersionConflict` the caller must re-read, re-validate
    ///   availability and re-apply its movement
    pub async fn save(&self, item: &mut StockItem) -> DbResult<()> {
        let expected = item.version;
        // Write the bumped version into the body so document and column agree
        item.version = expected + 1;

        let result = self
            .store
            .put_versioned(collections::STOCK_ITEMS, &item.product_id, item, expected)
            .await;

        match result {
            Ok(version) => {
                debug!(
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    version = version,
                    "Ledger saved"
                );
                Ok(())
            }
            Err(e) => {
                item.version = expected;
                Err(e)
            }
        }
    }

    /// Lists every ledger (operator tooling, reconciliation reports).
    pub async fn list(&self) -> DbResult<Vec<StockItem>> {
        self.store.list(collections::STOCK_ITEMS).await
    }

    /// Gets a ledger or fails with NotFound.
    pub async fn get_required(&self, product_id: &str) -> DbResult<StockItem> {
        self.get(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockItem", product_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use tienda_core::{Category, Product, SaleLine, SalesChannel, StockMovement, Supplier};

    fn test_product(stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Widget".to_string(),
            price_cents: 100,
            has_iva: false,
            iva_per_unit_cents: 0,
            price_without_iva_cents: 0,
            iva_rate_bps: 0,
            stock,
            category: Category::default(),
            supplier: Supplier::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale(product: &Product, quantity: i64, txn: &str) -> StockMovement {
        StockMovement::sale(
            product,
            quantity,
            SaleLine {
                transaction_id: txn.to_string(),
                unit_price_cents: product.price_cents,
                line_total_cents: product.price_cents * quantity,
                iva_total_cents: 0,
                line_total_without_iva_cents: product.price_cents * quantity,
                printed: false,
                paid: false,
                selected: false,
                production: false,
                discount_cents: 0,
                discount_reason: None,
                for_who: "Ana".to_string(),
                channel: SalesChannel::OnlineStore,
            },
        )
    }

    #[tokio::test]
    async fn test_seed_save_reload() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ledgers();
        let product = test_product(5);

        assert!(repo.get("p1").await.unwrap().is_none());

        let mut ledger = StockItem::seed(&product);
        ledger.add_outgoing(sale(&product, 2, "TXN-1")).unwrap();
        repo.save(&mut ledger).await.unwrap();
        assert_eq!(ledger.version, 1);

        let reloaded = repo.get("p1").await.unwrap().unwrap();
        assert_eq!(reloaded.quantity, 3);
        assert_eq!(reloaded.version, 1);
        assert!(reloaded.contains_sale("TXN-1"));
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ledgers();
        let product = test_product(5);

        let mut first = StockItem::seed(&product);
        let mut second = first.clone();

        first.add_outgoing(sale(&product, 1, "TXN-1")).unwrap();
        repo.save(&mut first).await.unwrap();

        second.add_outgoing(sale(&product, 1, "TXN-2")).unwrap();
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { .. }));
        // The failed save must not advance the caller's token
        assert_eq!(second.version, 0);

        // Re-read, re-apply, succeed
        let mut fresh = repo.get("p1").await.unwrap().unwrap();
        fresh.add_outgoing(sale(&product, 1, "TXN-2")).unwrap();
        repo.save(&mut fresh).await.unwrap();
        assert_eq!(repo.get("p1").await.unwrap().unwrap().quantity, 3);
    }
}
