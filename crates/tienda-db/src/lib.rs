//! # tienda-db: Document Store Layer for Tienda
//!
//! All persistence for the order fulfillment subsystem: a key-value-with-
//! query document store over SQLite, plus typed repositories for each named
//! collection.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tienda-checkout / tienda-sync                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database ──► products() · transactions() · ledgers() · carts()        │
//! │       │       settings() · outbox() · store()                          │
//! │       ▼                                                                 │
//! │  DocumentStore ──► documents(collection, id, body, version)            │
//! │       │            sync_outbox(step, transaction_id, …)                │
//! │       ▼                                                                 │
//! │  SQLite (WAL mode, embedded migrations)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::collections;
pub use store::DocumentStore;
