//! # Cart Backup Repository
//!
//! Durable backup of carts, keyed by client id.
//!
//! The web layer owns cart mutation and keeps the live cart in its own
//! transient store; this repository is the durable copy that survives a
//! process restart. Checkout's final step deletes both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DbResult;
use crate::repository::collections;
use crate::store::DocumentStore;
use tienda_core::CartLine;

/// Stored shape of a backed-up cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartBackup {
    pub client_id: String,
    pub lines: Vec<CartLine>,
    pub saved_at: DateTime<Utc>,
}

/// Repository for durable cart backups.
#[derive(Debug, Clone)]
pub struct CartBackupRepository {
    store: DocumentStore,
}

impl CartBackupRepository {
    /// Creates a new CartBackupRepository.
    pub fn new(store: DocumentStore) -> Self {
        CartBackupRepository { store }
    }

    /// Gets a client's backed-up cart lines.
    pub async fn get(&self, client_id: &str) -> DbResult<Option<Vec<CartLine>>> {
        let backup: Option<CartBackup> = self.store.get(collections::CARTS, client_id).await?;
        Ok(backup.map(|b| b.lines))
    }

    /// Saves a client's cart lines, replacing any previous backup.
    pub async fn put(&self, client_id: &str, lines: &[CartLine]) -> DbResult<()> {
        let backup = CartBackup {
            client_id: client_id.to_string(),
            lines: lines.to_vec(),
            saved_at: Utc::now(),
        };
        self.store.put(collections::CARTS, client_id, &backup).await
    }

    /// Deletes a client's cart backup. Idempotent.
    pub async fn delete(&self, client_id: &str) -> DbResult<bool> {
        self.store.delete(collections::CARTS, client_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_put_get_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.carts();

        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 2,
        }];

        repo.put("client-1", &lines).await.unwrap();
        assert_eq!(repo.get("client-1").await.unwrap(), Some(lines));

        assert!(repo.delete("client-1").await.unwrap());
        assert_eq!(repo.get("client-1").await.unwrap(), None);
        // Second delete is a quiet no-op
        assert!(!repo.delete("client-1").await.unwrap());
    }
}
