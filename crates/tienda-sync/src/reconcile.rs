//! # Reconciliation Worker
//!
//! Replays failed best-effort checkout steps from the sync outbox.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Reconciliation Worker Flow                             │
//! │                                                                         │
//! │  every poll_interval:                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Poll: pending outbox entries (done_at IS NULL), oldest first       │
//! │                                                                         │
//! │  2. Skip entries past max_attempts (logged for operators; a manual     │
//! │     resync_transaction is the escape hatch)                            │
//! │                                                                         │
//! │  3. Replay each remaining entry IDEMPOTENTLY, keyed by transaction id: │
//! │       mirror → re-put the stored external document (idempotent by key) │
//! │       ledger → re-read the primary record and apply only movements     │
//! │                whose ledger does not already contain this transaction  │
//! │                                                                         │
//! │  4. mark_done on success, mark_failed (attempts += 1) otherwise        │
//! │                                                                         │
//! │  IDEMPOTENCY IS THE WHOLE GAME: the worker may race the inline         │
//! │  checkout attempt or itself after a crash, and a double-applied        │
//! │  ledger decrement would corrupt stock. `StockItem::contains_sale`      │
//! │  plus the versioned CAS save make replays safe.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::mirror::MirrorWriter;
use crate::translator::ExternalTransaction;
use tienda_core::{OutboxEntry, OutboxStep, StockItem, Transaction};
use tienda_db::{Database, DbError};

/// Attempts at the CAS loop before giving up on a ledger write.
const CAS_RETRY_LIMIT: u32 = 5;

/// Budget for one mirror write, retried with exponential backoff.
const MIRROR_WRITE_BUDGET: Duration = Duration::from_secs(10);

// =============================================================================
// Ledger Application
// =============================================================================

/// Applies a transaction's outgoing movements to the per-product ledgers
/// and persists the decremented product stock figures.
///
/// Shared by the inline checkout attempt and outbox replays; both paths
/// must behave identically:
/// - the ledger is fetched (or lazily seeded from the product) and saved
///   with a versioned compare-and-swap
/// - on a version conflict the ledger is re-read and availability
///   re-validated at mutation time, then the movement is re-applied
/// - a product whose ledger already contains this transaction is skipped,
///   which is what makes replays idempotent
pub async fn apply_ledger(db: &Database, transaction: &Transaction) -> SyncResult<()> {
    let ledgers = db.ledgers();
    let products = db.products();

    for movement in &transaction.movements {
        if movement.as_sale().is_none() {
            continue;
        }
        let product_id = &movement.product.product_id;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let mut ledger = match ledgers.get(product_id).await? {
                Some(ledger) => ledger,
                None => {
                    // First movement against this product: seed from the
                    // catalog's stock figure
                    let product = products.get(product_id).await?.ok_or_else(|| {
                        SyncError::Db(DbError::not_found("Product", product_id))
                    })?;
                    StockItem::seed(&product)
                }
            };

            if ledger.contains_sale(&transaction.id) {
                debug!(
                    product_id = %product_id,
                    transaction_id = %transaction.id,
                    "Ledger already contains this sale, skipping"
                );
                break;
            }

            // Availability was checked before pricing, but the figure may
            // have moved since; the order already exists, so a shortfall
            // here can only be clamped and flagged
            if ledger.quantity < movement.quantity {
                warn!(
                    product_id = %product_id,
                    transaction_id = %transaction.id,
                    available = ledger.quantity,
                    requested = movement.quantity,
                    "Stock clamped at zero during ledger update"
                );
            }

            ledger.add_outgoing(movement.clone())?;

            match ledgers.save(&mut ledger).await {
                Ok(()) => {
                    products.set_stock(product_id, ledger.quantity).await?;
                    debug!(
                        product_id = %product_id,
                        quantity = ledger.quantity,
                        "Ledger updated"
                    );
                    break;
                }
                Err(DbError::VersionConflict { .. }) if attempts < CAS_RETRY_LIMIT => {
                    debug!(
                        product_id = %product_id,
                        attempts = attempts,
                        "Ledger version conflict, re-reading"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

// =============================================================================
// Reconciliation Worker
// =============================================================================

/// Background worker replaying pending outbox entries.
pub struct ReconciliationWorker {
    db: Database,
    config: Arc<SyncConfig>,
    mirror: MirrorWriter,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the reconciliation worker.
#[derive(Clone)]
pub struct ReconciliationWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReconciliationWorkerHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Shutdown channel closed".into()))
    }
}

impl ReconciliationWorker {
    /// Creates a new worker and returns a handle.
    pub fn new(db: Database, config: Arc<SyncConfig>) -> (Self, ReconciliationWorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let mirror = MirrorWriter::new(db.clone(), config.business.id.clone());
        let worker = ReconciliationWorker {
            db,
            config,
            mirror,
            shutdown_rx,
        };

        (worker, ReconciliationWorkerHandle { shutdown_tx })
    }

    /// Runs the worker loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Reconciliation worker starting");

        let poll_interval = Duration::from_secs(self.config.reconcile.poll_interval_secs);
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_pending().await {
                        error!(?e, "Failed to process outbox batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Reconciliation worker shutting down");
                    break;
                }
            }
        }

        info!("Reconciliation worker stopped");
    }

    /// Processes one batch of pending outbox entries.
    ///
    /// Exposed so tests (and operator tooling) can drive a pass without
    /// waiting for the interval.
    ///
    /// ## Returns
    /// Number of entries replayed successfully.
    pub async fn process_pending(&self) -> SyncResult<usize> {
        let entries = self
            .db
            .outbox()
            .pending(self.config.reconcile.batch_size)
            .await?;

        if entries.is_empty() {
            debug!("No pending outbox entries");
            return Ok(0);
        }

        info!(count = entries.len(), "Processing outbox batch");

        let max_attempts = self.config.reconcile.max_attempts;
        let mut replayed = 0;

        for entry in entries {
            if entry.attempts >= max_attempts {
                warn!(
                    id = %entry.id,
                    step = %entry.step,
                    business_id = %entry.business_id,
                    transaction_id = %entry.transaction_id,
                    attempts = entry.attempts,
                    "Outbox entry exceeded max attempts, leaving for manual resync"
                );
                continue;
            }

            match self.replay(&entry).await {
                Ok(()) => {
                    self.db.outbox().mark_done(&entry.id).await?;
                    replayed += 1;
                }
                Err(e) => {
                    warn!(
                        ?e,
                        id = %entry.id,
                        step = %entry.step,
                        business_id = %entry.business_id,
                        transaction_id = %entry.transaction_id,
                        "Outbox replay failed"
                    );
                    self.db
                        .outbox()
                        .mark_failed(&entry.id, &e.to_string())
                        .await?;
                }
            }
        }

        Ok(replayed)
    }

    /// Replays one outbox entry.
    async fn replay(&self, entry: &OutboxEntry) -> SyncResult<()> {
        match entry.step {
            OutboxStep::Mirror => self.replay_mirror(entry).await,
            OutboxStep::Ledger => self.replay_ledger(entry).await,
        }
    }

    /// Re-puts the stored external document; falls back to re-translating
    /// the primary record when the payload is unreadable.
    async fn replay_mirror(&self, entry: &OutboxEntry) -> SyncResult<()> {
        let document: Option<ExternalTransaction> = serde_json::from_str(&entry.payload).ok();

        let Some(document) = document else {
            warn!(
                transaction_id = %entry.transaction_id,
                "Unreadable mirror payload, resyncing from primary record"
            );
            return self.mirror.resync_transaction(&entry.transaction_id).await;
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(MIRROR_WRITE_BUDGET))
            .build();

        backoff::future::retry(policy, || async {
            self.mirror
                .write_document(&entry.transaction_id, &document)
                .await
                .map_err(backoff::Error::transient)
        })
        .await
    }

    /// Re-reads the primary record and applies its movements idempotently.
    async fn replay_ledger(&self, entry: &OutboxEntry) -> SyncResult<()> {
        let transaction = self
            .db
            .transactions()
            .get(&entry.transaction_id)
            .await?
            .ok_or_else(|| SyncError::TransactionNotFound {
                transaction_id: entry.transaction_id.clone(),
            })?;

        apply_ledger(&self.db, &transaction).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
