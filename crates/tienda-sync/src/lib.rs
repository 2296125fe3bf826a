//! # tienda-sync: POS Synchronization for Tienda
//!
//! Everything that keeps the storefront and the external POS system in
//! agreement:
//!
//! - [`translator`] - the hand-maintained, total mapping between the
//!   internal shapes and the external POS document schema
//! - [`mirror`] - best-effort writes to `{businessId}/transaction`, plus
//!   the manual resync operation
//! - [`cache`] - the TTL-less catalog/settings snapshot cache with
//!   single-flight refresh
//! - [`poller`] - the background staleness poller watching the catalog
//!   marker for out-of-band edits
//! - [`reconcile`] - the outbox replay worker and the shared ledger
//!   application path
//! - [`config`] - process-level TOML configuration
//!
//! ## Consistency Model
//! The primary order record is the source of truth. Mirror and ledger
//! consistency is asynchronous and self-healing: failed steps leave
//! durable outbox entries, the reconciliation worker retries them
//! idempotently, and `MirrorWriter::resync_transaction` is the manual
//! escape hatch for anything that outlives the retry budget.

pub mod cache;
pub mod config;
pub mod error;
pub mod mirror;
pub mod poller;
pub mod reconcile;
pub mod translator;

pub use cache::{CacheKey, Snapshot, SnapshotCache};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use mirror::MirrorWriter;
pub use poller::{StalenessPoller, StalenessPollerHandle};
pub use reconcile::{apply_ledger, ReconciliationWorker, ReconciliationWorkerHandle};
pub use translator::{restore_transaction, translate_transaction, ExternalTransaction};
