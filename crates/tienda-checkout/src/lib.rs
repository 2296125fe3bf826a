//! # tienda-checkout: Checkout Orchestration for Tienda
//!
//! The thin orchestration layer the web layer calls: it sequences
//! validation, stock checking, pricing, persistence, POS mirroring, ledger
//! mutation and cart clearing as one user-facing operation.
//!
//! ## Usage
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./tienda.db")).await?;
//! let config = Arc::new(SyncConfig::load_or_default("./tienda-sync.toml")?);
//! let cache = Arc::new(SnapshotCache::new(db.clone(), config.business.id.clone()));
//! let carts = CartStore::new();
//!
//! let orchestrator = CheckoutOrchestrator::new(db, cache, carts, config);
//! let outcome = orchestrator.checkout(&lines, &customer).await?;
//! println!("order {}", outcome.transaction_id);
//! ```

pub mod cart;
pub mod error;
pub mod orchestrator;

pub use cart::CartStore;
pub use error::{CheckoutError, CheckoutResult};
pub use orchestrator::{CheckoutOrchestrator, CheckoutOutcome};
