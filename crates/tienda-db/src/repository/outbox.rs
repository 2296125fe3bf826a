//! # Sync Outbox Repository
//!
//! Durable queue of best-effort checkout steps awaiting reconciliation.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  CHECKOUT (after the primary transaction write)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. INSERT INTO sync_outbox (step, transaction_id, payload)            │
//! │     VALUES ('mirror', 'TXN-…', <external document JSON>)               │
//! │  2. Attempt the mirror write inline                                    │
//! │     ├── success → UPDATE sync_outbox SET done_at = NOW()               │
//! │     └── failure → logged; entry stays pending                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          RECONCILIATION WORKER (tienda-sync, async)             │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM sync_outbox WHERE done_at IS NULL            │   │
//! │  │  2. Replay each step idempotently (keyed by transaction id)    │   │
//! │  │  3. On success: mark_done · On failure: attempts += 1          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • The order is never lost (it's in the primary store)                 │
//! │  • A failed mirror/ledger step is never forgotten (durable entry)      │
//! │  • Replays cannot double-apply (idempotency keyed by transaction id)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tienda_core::{OutboxEntry, OutboxStep};

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

/// Row shape of the sync_outbox table.
#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: String,
    business_id: String,
    step: String,
    transaction_id: String,
    payload: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    attempted_at: Option<DateTime<Utc>>,
    done_at: Option<DateTime<Utc>>,
}

impl OutboxRow {
    fn into_entry(self) -> DbResult<OutboxEntry> {
        let step = OutboxStep::parse(&self.step)
            .ok_or_else(|| DbError::Internal(format!("Unknown outbox step: {}", self.step)))?;

        Ok(OutboxEntry {
            id: self.id,
            business_id: self.business_id,
            step,
            transaction_id: self.transaction_id,
            payload: self.payload,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            attempted_at: self.attempted_at,
            done_at: self.done_at,
        })
    }
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Enqueues a best-effort step for a transaction.
    ///
    /// ## Arguments
    /// * `step` - which step this entry replays (mirror or ledger)
    /// * `transaction_id` - the idempotency key
    /// * `payload` - step-specific JSON
    pub async fn enqueue(
        &self,
        business_id: &str,
        step: OutboxStep,
        transaction_id: &str,
        payload: &str,
    ) -> DbResult<OutboxEntry> {
        let entry = OutboxEntry {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            step,
            transaction_id: transaction_id.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            done_at: None,
        };

        debug!(
            step = %step,
            transaction_id = %transaction_id,
            "Enqueuing outbox entry"
        );

        sqlx::query(
            r#"
            INSERT INTO sync_outbox (
                id, business_id, step, transaction_id, payload,
                attempts, last_error, created_at, attempted_at, done_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.business_id)
        .bind(entry.step.as_str())
        .bind(&entry.transaction_id)
        .bind(&entry.payload)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.done_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets pending entries (oldest first).
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, step, transaction_id, payload,
                   attempts, last_error, created_at, attempted_at, done_at
            FROM sync_outbox
            WHERE done_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OutboxRow::into_entry).collect()
    }

    /// Marks an entry as successfully replayed.
    pub async fn mark_done(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sync_outbox SET
                done_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a failed attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts pending entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE done_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes old completed entries (cleanup).
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_old_entries(&self, days_old: u32) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sync_outbox
            WHERE done_at IS NOT NULL
            AND done_at < datetime('now', '-' || ?1 || ' days')
            "#,
        )
        .bind(days_old)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
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
    async fn test_enqueue_and_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.outbox();

        repo.enqueue("biz-1", OutboxStep::Mirror, "TXN-1", "{}")
            .await
            .unwrap();
        repo.enqueue("biz-1", OutboxStep::Ledger, "TXN-1", "{}")
            .await
            .unwrap();

        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].step, OutboxStep::Mirror);
        assert_eq!(repo.count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_done_removes_from_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.outbox();

        let entry = repo
            .enqueue("biz-1", OutboxStep::Mirror, "TXN-1", "{}")
            .await
            .unwrap();
        repo.mark_done(&entry.id).await.unwrap();

        assert!(repo.pending(10).await.unwrap().is_empty());
        assert_eq!(repo.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_failed_increments_attempts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.outbox();

        let entry = repo
            .enqueue("biz-1", OutboxStep::Ledger, "TXN-1", "{}")
            .await
            .unwrap();
        repo.mark_failed(&entry.id, "mirror path unavailable")
            .await
            .unwrap();

        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(
            pending[0].last_error.as_deref(),
            Some("mirror path unavailable")
        );
        assert!(pending[0].attempted_at.is_some());
    }
}
