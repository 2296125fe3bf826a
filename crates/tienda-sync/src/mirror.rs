//! # Mirror Writer
//!
//! Writes translated transactions to the POS mirror path.
//!
//! ## Mirror Path
//! The external system reads orders from the collection
//! `{businessId}/transaction`, keyed by the same transaction id used
//! internally. Writes are idempotent puts: re-mirroring a transaction
//! simply replaces the document, which is what makes outbox replays and
//! manual resyncs safe.
//!
//! ## Failure Policy
//! Mirror writes are best-effort from checkout's perspective: the order is
//! already real in the primary store, so a failed write is logged with
//! business id + transaction id and left for the reconciliation worker (or
//! an operator running `resync_transaction`).

use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::translator::{translate_transaction, ExternalTransaction};
use tienda_core::Transaction;
use tienda_db::{collections, Database};

/// Writes translated transactions into the POS mirror collection.
#[derive(Debug, Clone)]
pub struct MirrorWriter {
    db: Database,
    business_id: String,
}

impl MirrorWriter {
    /// Creates a new MirrorWriter for a business.
    pub fn new(db: Database, business_id: impl Into<String>) -> Self {
        MirrorWriter {
            db,
            business_id: business_id.into(),
        }
    }

    /// The collection this writer mirrors into.
    pub fn collection(&self) -> String {
        collections::mirror(&self.business_id)
    }

    /// Translates and writes a transaction to the mirror path.
    pub async fn write(&self, transaction: &Transaction) -> SyncResult<()> {
        let document = translate_transaction(transaction);
        self.write_document(&transaction.id, &document).await
    }

    /// Writes an already-translated document to the mirror path.
    ///
    /// Used by the reconciliation worker, which stores the translated
    /// payload in the outbox entry.
    pub async fn write_document(
        &self,
        transaction_id: &str,
        document: &ExternalTransaction,
    ) -> SyncResult<()> {
        self.db
            .store()
            .put(&self.collection(), transaction_id, document)
            .await?;

        debug!(
            business_id = %self.business_id,
            transaction_id = %transaction_id,
            "Transaction mirrored"
        );

        Ok(())
    }

    /// Reads a mirrored document back (operator verification only).
    pub async fn read(&self, transaction_id: &str) -> SyncResult<Option<ExternalTransaction>> {
        Ok(self
            .db
            .store()
            .get(&self.collection(), transaction_id)
            .await?)
    }

    /// Manual resync: re-translates the primary record and re-writes the
    /// mirror document.
    ///
    /// ## When To Use
    /// - A mirror write failed past the reconciliation worker's attempt
    ///   budget
    /// - The external side lost or corrupted a document
    pub async fn resync_transaction(&self, transaction_id: &str) -> SyncResult<()> {
        let transaction = self
            .db
            .transactions()
            .get(transaction_id)
            .await?
            .ok_or_else(|| SyncError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
            })?;

        self.write(&transaction).await?;

        info!(
            business_id = %self.business_id,
            transaction_id = %transaction_id,
            "Transaction resynced to mirror"
        );

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tienda_core::{
        build_transaction, CartLine, Category, CustomerInfo, Product, Supplier,
    };
    use tienda_db::DbConfig;

    fn test_product() -> Product {
        Product {
            id: "p1".to_string(),
            name: "Widget".to_string(),
            price_cents: 100,
            has_iva: true,
            iva_per_unit_cents: 15,
            price_without_iva_cents: 85,
            iva_rate_bps: 1600,
            stock: 10,
            category: Category::default(),
            supplier: Supplier::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_transaction() -> Transaction {
        let customer = CustomerInfo {
            client_id: "client-1".to_string(),
            name: "Ana".to_string(),
            phone: "555-0101".to_string(),
            ..Default::default()
        };
        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 2,
        }];
        build_transaction("biz-1", &lines, &[test_product()], &customer).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read_mirror_document() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let writer = MirrorWriter::new(db.clone(), "biz-1");
        let txn = test_transaction();

        writer.write(&txn).await.unwrap();

        let mirrored = writer.read(&txn.id).await.unwrap().unwrap();
        assert_eq!(mirrored.transaction_id, txn.id);
        assert_eq!(mirrored.total, 200);
        assert_eq!(writer.collection(), "biz-1/transaction");
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let writer = MirrorWriter::new(db.clone(), "biz-1");
        let txn = test_transaction();

        writer.write(&txn).await.unwrap();
        writer.write(&txn).await.unwrap();

        assert_eq!(db.store().count("biz-1/transaction").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resync_reads_primary_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let writer = MirrorWriter::new(db.clone(), "biz-1");
        let txn = test_transaction();

        db.transactions().insert(&txn).await.unwrap();

        // Nothing mirrored yet (simulates a lost mirror write)
        assert!(writer.read(&txn.id).await.unwrap().is_none());

        writer.resync_transaction(&txn.id).await.unwrap();
        assert!(writer.read(&txn.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resync_unknown_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let writer = MirrorWriter::new(db, "biz-1");

        let err = writer.resync_transaction("TXN-nope").await.unwrap_err();
        assert!(matches!(err, SyncError::TransactionNotFound { .. }));
    }
}
