//! # Checkout Orchestrator
//!
//! Sequences one user-facing checkout from cart snapshot to transaction id.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout State Machine                              │
//! │                                                                         │
//! │  Validating ──► StockChecked ──► Priced ──► Persisted ──► Mirrored     │
//! │      │               │                          │              │        │
//! │      │               │                          │              ▼        │
//! │      ▼               ▼                          ▼         LedgerUpdated │
//! │   Aborted         Aborted                    Aborted           │        │
//! │   (field          (every                     (write            ▼        │
//! │    errors)         shortfall)                 failed)       Cleared     │
//! │                                                                         │
//! │  Hard boundary after Persisted: once the primary write lands the       │
//! │  order EXISTS. Mirror and ledger steps are best-effort: each gets a    │
//! │  durable outbox record before its inline attempt, failures are logged  │
//! │  with business id + transaction id, and the reconciliation worker      │
//! │  replays them. The customer sees success either way.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Notes
//! Steps run in strict sequence within one checkout; there is no mutual
//! exclusion ACROSS checkouts. Two carts can both pass the stock check
//! before either touches the ledger; the versioned ledger save is what
//! keeps the decrement exactly-once (see `tienda_sync::apply_ledger`).
//!
//! The product snapshots come from the shared cache, and checkout does NOT
//! invalidate it: the cache lifecycle belongs to the upstream marker and
//! the staleness poller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cart::CartStore;
use crate::error::{CheckoutError, CheckoutResult};
use tienda_core::{
    build_transaction, validate_checkout, CartLine, CustomerInfo, FieldError, Product, Shortfall,
    Transaction,
};
use tienda_db::{Database, DbError};
use tienda_sync::{
    apply_ledger, translate_transaction, MirrorWriter, SnapshotCache, SyncConfig, SyncError,
};
use tienda_core::OutboxStep;

/// What a successful checkout returns to the web layer.
///
/// `mirrored` / `ledger_updated` report whether the inline best-effort
/// attempts landed; `false` means the reconciliation worker owns the step
/// now, not that the order failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub transaction_id: String,
    pub grand_total_cents: i64,
    pub iva_amount_cents: i64,
    pub item_count: usize,
    pub mirrored: bool,
    pub ledger_updated: bool,
}

/// Orchestrates checkouts against the shared cache, store and mirror.
pub struct CheckoutOrchestrator {
    db: Database,
    cache: Arc<SnapshotCache>,
    carts: CartStore,
    config: Arc<SyncConfig>,
    mirror: MirrorWriter,
}

impl CheckoutOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(
        db: Database,
        cache: Arc<SnapshotCache>,
        carts: CartStore,
        config: Arc<SyncConfig>,
    ) -> Self {
        let mirror = MirrorWriter::new(db.clone(), config.business.id.clone());
        CheckoutOrchestrator {
            db,
            cache,
            carts,
            config,
            mirror,
        }
    }

    /// Runs one checkout to completion.
    ///
    /// Returns the transaction id once the primary write has landed,
    /// regardless of mirror/ledger partial failures.
    pub async fn checkout(
        &self,
        lines: &[CartLine],
        customer: &CustomerInfo,
    ) -> CheckoutResult<CheckoutOutcome> {
        // ---- Validating -----------------------------------------------------
        if let Err(errors) = validate_checkout(lines, customer) {
            debug!(client_id = %customer.client_id, count = errors.len(), "Checkout validation failed");
            return Err(CheckoutError::ValidationFailed { errors });
        }

        let settings = self
            .cache
            .settings()
            .await
            .map_err(store_failure)?;
        let products = self
            .cache
            .products()
            .await
            .map_err(store_failure)?;

        // Every line must resolve against the snapshot set before anything
        // else runs; a missing product is a validation failure, not a
        // silent skip
        let resolved = resolve_lines(lines, &products)?;

        // ---- StockChecked ---------------------------------------------------
        if settings.stock_validation_enabled {
            let shortfalls = collect_shortfalls(&resolved);
            if !shortfalls.is_empty() {
                info!(
                    client_id = %customer.client_id,
                    count = shortfalls.len(),
                    "Checkout aborted on stock check"
                );
                return Err(CheckoutError::StockInsufficient { shortfalls });
            }
        }
        debug!(client_id = %customer.client_id, "Stock check passed");

        // ---- Priced ---------------------------------------------------------
        let transaction =
            build_transaction(&self.config.business.id, lines, &products, customer).map_err(
                |e| CheckoutError::ValidationFailed {
                    errors: vec![FieldError {
                        field: "cart".to_string(),
                        message: e.to_string(),
                    }],
                },
            )?;

        // ---- Persisted ------------------------------------------------------
        self.db
            .transactions()
            .insert(&transaction)
            .await
            .map_err(CheckoutError::persistence)?;

        info!(
            transaction_id = %transaction.id,
            client_id = %customer.client_id,
            grand_total = transaction.grand_total_cents,
            items = transaction.movements.len(),
            "Transaction persisted"
        );

        // From here on the order exists; nothing below may fail the checkout.

        // ---- Mirrored -------------------------------------------------------
        let mirrored = if settings.pos_integration_enabled {
            self.mirror_step(&transaction).await
        } else {
            debug!(transaction_id = %transaction.id, "POS integration disabled, skipping mirror");
            false
        };

        // ---- LedgerUpdated --------------------------------------------------
        let ledger_updated = self.ledger_step(&transaction).await;

        // ---- Cleared --------------------------------------------------------
        self.clear_cart(&customer.client_id).await;

        Ok(CheckoutOutcome {
            transaction_id: transaction.id.clone(),
            grand_total_cents: transaction.grand_total_cents,
            iva_amount_cents: transaction.iva_amount_cents,
            item_count: transaction.movements.len(),
            mirrored,
            ledger_updated,
        })
    }

    /// Best-effort mirror write: durable outbox record first, inline
    /// attempt second.
    async fn mirror_step(&self, transaction: &Transaction) -> bool {
        let document = translate_transaction(transaction);
        let payload = match serde_json::to_string(&document) {
            Ok(payload) => payload,
            Err(e) => {
                // Translation output always serializes
                error!(?e, transaction_id = %transaction.id, "Mirror payload serialization failed");
                return false;
            }
        };

        let entry = match self
            .db
            .outbox()
            .enqueue(
                &self.config.business.id,
                OutboxStep::Mirror,
                &transaction.id,
                &payload,
            )
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(
                    ?e,
                    business_id = %self.config.business.id,
                    transaction_id = %transaction.id,
                    "Failed to enqueue mirror outbox entry"
                );
                None
            }
        };

        match self.mirror.write_document(&transaction.id, &document).await {
            Ok(()) => {
                if let Some(entry) = entry {
                    if let Err(e) = self.db.outbox().mark_done(&entry.id).await {
                        warn!(?e, id = %entry.id, "Failed to mark mirror entry done");
                    }
                }
                true
            }
            Err(e) => {
                warn!(
                    ?e,
                    business_id = %self.config.business.id,
                    transaction_id = %transaction.id,
                    "Mirror write failed, order stands; reconciliation will retry"
                );
                false
            }
        }
    }

    /// Best-effort ledger update: durable outbox record first, inline
    /// attempt second.
    async fn ledger_step(&self, transaction: &Transaction) -> bool {
        let entry = match self
            .db
            .outbox()
            .enqueue(
                &self.config.business.id,
                OutboxStep::Ledger,
                &transaction.id,
                // The primary record is the replay source; no payload needed
                "{}",
            )
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                error!(
                    ?e,
                    business_id = %self.config.business.id,
                    transaction_id = %transaction.id,
                    "Failed to enqueue ledger outbox entry"
                );
                None
            }
        };

        match apply_ledger(&self.db, transaction).await {
            Ok(()) => {
                if let Some(entry) = entry {
                    if let Err(e) = self.db.outbox().mark_done(&entry.id).await {
                        warn!(?e, id = %entry.id, "Failed to mark ledger entry done");
                    }
                }
                true
            }
            Err(e) => {
                warn!(
                    ?e,
                    business_id = %self.config.business.id,
                    transaction_id = %transaction.id,
                    "Ledger update failed, inventory may drift until reconciled"
                );
                false
            }
        }
    }

    /// Removes the cart from the transient store and its durable backup.
    async fn clear_cart(&self, client_id: &str) {
        self.carts.remove(client_id);

        if let Err(e) = self.db.carts().delete(client_id).await {
            warn!(?e, client_id = %client_id, "Failed to delete durable cart backup");
        }
        debug!(client_id = %client_id, "Cart cleared");
    }
}

/// Maps pre-persistence store failures to the retry-safe checkout error.
fn store_failure(e: SyncError) -> CheckoutError {
    match e {
        SyncError::Db(db) => CheckoutError::persistence(db),
        other => CheckoutError::persistence(DbError::Internal(other.to_string())),
    }
}

/// Resolves every cart line against the product snapshot set.
fn resolve_lines<'a>(
    lines: &'a [CartLine],
    products: &'a [Product],
) -> CheckoutResult<Vec<(&'a CartLine, &'a Product)>> {
    let mut resolved = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for line in lines {
        match products.iter().find(|p| p.id == line.product_id) {
            Some(product) => resolved.push((line, product)),
            None => errors.push(FieldError {
                field: "cart".to_string(),
                message: format!("unknown product: {}", line.product_id),
            }),
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(CheckoutError::ValidationFailed { errors })
    }
}

/// Collects every shortfall in the cart, not just the first.
fn collect_shortfalls(resolved: &[(&CartLine, &Product)]) -> Vec<Shortfall> {
    resolved
        .iter()
        .filter(|(line, product)| product.stock < line.quantity)
        .map(|(line, product)| Shortfall {
            product_id: product.id.clone(),
            name: product.name.clone(),
            available: product.stock,
            requested: line.quantity,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
