//! # Transaction Repository
//!
//! Persistence for the order aggregate.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transaction Lifecycle                               │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert() → whole priced aggregate, id assigned once            │
//! │                                                                         │
//! │  2. FULFILLMENT                                                        │
//! │     └── advance_status() → received → … → delivered                    │
//! │     └── cancel()                                                       │
//! │     └── add_payment() → re-derives partial-payment state               │
//! │                                                                         │
//! │  The aggregate is never rebuilt: every post-checkout mutation goes     │
//! │  through a status-transition operation on the stored document.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::collections;
use crate::store::DocumentStore;
use tienda_core::{OrderStatus, Payment, Transaction};

/// Repository for transaction operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    store: DocumentStore,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(store: DocumentStore) -> Self {
        TransactionRepository { store }
    }

    /// Inserts a new transaction.
    ///
    /// The id was assigned once at creation; inserting it twice is a
    /// programming error and surfaces as `AlreadyExists`.
    pub async fn insert(&self, transaction: &Transaction) -> DbResult<()> {
        debug!(
            transaction_id = %transaction.id,
            grand_total = transaction.grand_total_cents,
            movements = transaction.movements.len(),
            "Inserting transaction"
        );

        self.store
            .insert(collections::TRANSACTIONS, &transaction.id, transaction)
            .await
    }

    /// Gets a transaction by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Transaction>> {
        self.store.get(collections::TRANSACTIONS, id).await
    }

    /// Advances a transaction's order status, re-deriving fulfillment.
    ///
    /// ## Returns
    /// The updated transaction.
    pub async fn advance_status(&self, id: &str, next: OrderStatus) -> DbResult<Transaction> {
        let mut txn = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        txn.advance_status(next)?;
        self.store.put(collections::TRANSACTIONS, id, &txn).await?;

        debug!(transaction_id = %id, status = %next, "Transaction status advanced");
        Ok(txn)
    }

    /// Cancels a transaction.
    pub async fn cancel(&self, id: &str) -> DbResult<Transaction> {
        let mut txn = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        txn.cancel()?;
        self.store.put(collections::TRANSACTIONS, id, &txn).await?;

        debug!(transaction_id = %id, "Transaction cancelled");
        Ok(txn)
    }

    /// Records a payment against a transaction.
    pub async fn add_payment(&self, id: &str, payment: Payment) -> DbResult<Transaction> {
        let mut txn = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        debug!(
            transaction_id = %id,
            amount = payment.amount_cents,
            "Recording payment"
        );

        txn.record_payment(payment);
        self.store.put(collections::TRANSACTIONS, id, &txn).await?;

        Ok(txn)
    }

    /// Lists transactions in a given order status.
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Transaction>> {
        // Status serializes as its snake_case name inside documents
        let value = status.to_string();
        self.store
            .find_by_field(collections::TRANSACTIONS, "$.status", &value)
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
