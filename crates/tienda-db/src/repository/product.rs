//! # Product Repository
//!
//! Read-mostly access to the product catalog.
//!
//! The catalog is edited out-of-band by the POS/ERP side; this subsystem
//! reads it (and caches whole-collection snapshots in tienda-sync). The one
//! write this core performs is `set_stock`, which persists the decremented
//! stock figure after a ledger update.

use chrono::Utc;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::collections;
use crate::store::DocumentStore;
use tienda_core::Product;

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    store: DocumentStore,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(store: DocumentStore) -> Self {
        ProductRepository { store }
    }

    /// Gets a product by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        self.store.get(collections::PRODUCTS, id).await
    }

    /// Lists the whole catalog, ordered by id.
    ///
    /// This is the snapshot the catalog cache computes from.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        self.store.list(collections::PRODUCTS).await
    }

    /// Inserts or replaces a product.
    ///
    /// Used by the seed binary and tests; production catalog writes come
    /// from the POS/ERP side.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        self.store
            .put(collections::PRODUCTS, &product.id, product)
            .await
    }

    /// Persists a product's stock figure.
    ///
    /// ## When To Call
    /// After a ledger update: the ledger quantity is authoritative and
    /// this mirrors it onto the catalog document the storefront reads.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        let mut product: Product = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        product.stock = stock;
        product.updated_at = Utc::now();

        debug!(product_id = %id, stock = stock, "Persisting product stock figure");
        self.store.put(collections::PRODUCTS, id, &product).await
    }

    /// Counts catalog entries.
    pub async fn count(&self) -> DbResult<i64> {
        self.store.count(collections::PRODUCTS).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tienda_core::{Category, Supplier};

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents: 1000,
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

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.upsert(&product("p1", 5)).await.unwrap();
        let loaded = repo.get("p1").await.unwrap().unwrap();

        assert_eq!(loaded.id, "p1");
        assert_eq!(loaded.stock, 5);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.upsert(&product("p1", 5)).await.unwrap();
        repo.set_stock("p1", 2).await.unwrap();

        assert_eq!(repo.get("p1").await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_set_stock_missing_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().set_stock("nope", 2).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_orders_by_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.upsert(&product("b", 1)).await.unwrap();
        repo.upsert(&product("a", 1)).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a");
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
