//! # Repository Modules
//!
//! Typed access to the document store's named collections.
//!
//! ## Repository Pattern
//! Each repository wraps the generic [`DocumentStore`](crate::store::DocumentStore)
//! with domain-typed operations over one collection. Repositories are cheap
//! to create (they clone the store handle) and are handed out by
//! [`Database`](crate::pool::Database) accessor methods.

pub mod cart;
pub mod ledger;
pub mod outbox;
pub mod product;
pub mod settings;
pub mod transaction;

/// Collection names used across repositories.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const TRANSACTIONS: &str = "transactions";
    pub const STOCK_ITEMS: &str = "stock_items";
    pub const CARTS: &str = "carts";
    pub const SETTINGS: &str = "settings";
    pub const MARKERS: &str = "markers";

    /// The POS mirror path for a business: `{business_id}/transaction`.
    pub fn mirror(business_id: &str) -> String {
        format!("{}/transaction", business_id)
    }
}
