//! # Transient Cart Store
//!
//! In-process cart snapshots, keyed by client id.
//!
//! ## Ownership Split
//! The web layer owns cart MUTATION (add/remove/update lines) and pushes
//! the current snapshot here; this core only ever consumes a snapshot at
//! checkout time and clears it afterwards. The durable twin lives in
//! `tienda_db::repository::cart` and survives restarts; checkout's final
//! step clears both.
//!
//! ## Thread Safety
//! The map is wrapped in `Arc<Mutex<…>>`: checkouts for different clients
//! run concurrently, and each operation holds the lock only long enough to
//! clone or remove one entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tienda_core::CartLine;

/// Process-wide transient cart store.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    carts: Arc<Mutex<HashMap<String, Vec<CartLine>>>>,
}

impl CartStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        CartStore {
            carts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replaces a client's cart snapshot.
    pub fn set(&self, client_id: &str, lines: Vec<CartLine>) {
        self.carts
            .lock()
            .expect("cart store lock poisoned")
            .insert(client_id.to_string(), lines);
    }

    /// Returns a clone of a client's cart snapshot.
    pub fn get(&self, client_id: &str) -> Option<Vec<CartLine>> {
        self.carts
            .lock()
            .expect("cart store lock poisoned")
            .get(client_id)
            .cloned()
    }

    /// Removes a client's cart. Idempotent.
    pub fn remove(&self, client_id: &str) -> Option<Vec<CartLine>> {
        self.carts
            .lock()
            .expect("cart store lock poisoned")
            .remove(client_id)
    }

    /// Number of carts currently held.
    pub fn len(&self) -> usize {
        self.carts.lock().expect("cart store lock poisoned").len()
    }

    /// True when no carts are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<CartLine> {
        vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 2,
        }]
    }

    #[test]
    fn test_set_get_remove() {
        let store = CartStore::new();
        assert!(store.is_empty());

        store.set("client-1", lines());
        assert_eq!(store.get("client-1"), Some(lines()));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("client-1"), Some(lines()));
        assert_eq!(store.remove("client-1"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_clone_shares_state() {
        let store = CartStore::new();
        let other = store.clone();

        store.set("client-1", lines());
        assert_eq!(other.get("client-1"), Some(lines()));
    }
}
