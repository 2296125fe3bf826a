//! # Document Store
//!
//! Generic named-collection document operations over SQLite.
//!
//! ## Why a Document Store?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Document Store Layout                              │
//! │                                                                         │
//! │  documents table                                                       │
//! │  ┌────────────┬──────────┬───────────────┬─────────┬────────────┐      │
//! │  │ collection │    id    │     body      │ version │ updated_at │      │
//! │  ├────────────┼──────────┼───────────────┼─────────┼────────────┤      │
//! │  │ products   │ prod-1   │ {JSON}        │ 3       │ …          │      │
//! │  │ transactions│ TXN-…   │ {JSON}        │ 0       │ …          │      │
//! │  │ stock_items│ prod-1   │ {JSON}        │ 7       │ …          │      │
//! │  │ biz-1/transaction │ TXN-… │ {JSON}    │ 1       │ …          │      │
//! │  └────────────┴──────────┴───────────────┴─────────┴────────────┘      │
//! │                                                                         │
//! │  The core treats its store as key-value-with-query over NAMED          │
//! │  COLLECTIONS, not as a relational engine. Entities are whole JSON      │
//! │  documents; the POS mirror path is just another collection             │
//! │  ({business_id}/transaction). Only the sync outbox gets real columns   │
//! │  (see repository::outbox) because its bookkeeping is queried hot.      │
//! │                                                                         │
//! │  `version` is the optimistic-concurrency token: `put_versioned` is a  │
//! │  compare-and-swap, and the stock ledger is its only caller today.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Generic document operations over named collections.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Creates a new DocumentStore over a pool.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentStore { pool }
    }

    /// Gets a document by collection and id.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> DbResult<Option<T>> {
        let body: Option<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Gets a document together with its stored version.
    pub async fn get_versioned<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> DbResult<Option<(T, i64)>> {
        let row = sqlx::query(
            r#"
            SELECT body, version FROM documents
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                let version: i64 = row.try_get("version")?;
                Ok(Some((serde_json::from_str(&body)?, version)))
            }
            None => Ok(None),
        }
    }

    /// Upserts a document (insert or replace), bumping the version.
    pub async fn put<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> DbResult<()> {
        let body = serde_json::to_string(value)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, version, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                version = documents.version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(collection = %collection, id = %id, "Document stored");

        Ok(())
    }

    /// Inserts a document, failing if the id already exists.
    ///
    /// ## When To Use
    /// For identities assigned once at creation (transactions): re-running
    /// a write must surface `AlreadyExists` rather than overwrite history.
    pub async fn insert<T: Serialize>(&self, collection: &str, id: &str, value: &T) -> DbResult<()> {
        let body = serde_json::to_string(value)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, version, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from(e) {
                DbError::AlreadyExists { .. } => Err(DbError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.to_string(),
                }),
                other => Err(other),
            },
        }
    }

    /// Compare-and-swap write: succeeds only if the stored version still
    /// matches `expected_version`.
    ///
    /// ## Semantics
    /// - `expected_version == 0`: the document must not exist yet; it is
    ///   created at version 1.
    /// - otherwise: the row is updated and the version bumped, but only
    ///   if nobody else wrote in between.
    ///
    /// ## Returns
    /// The new stored version.
    pub async fn put_versioned<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
        expected_version: i64,
    ) -> DbResult<i64> {
        let body = serde_json::to_string(value)?;
        let now = Utc::now();

        if expected_version == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO documents (collection, id, body, version, updated_at)
                VALUES (?1, ?2, ?3, 1, ?4)
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .bind(now)
            .execute(&self.pool)
            .await;

            return match result {
                Ok(_) => Ok(1),
                Err(e) => match DbError::from(e) {
                    // Someone else created it first: caller must re-read
                    DbError::AlreadyExists { .. } => Err(DbError::VersionConflict {
                        collection: collection.to_string(),
                        id: id.to_string(),
                        expected: 0,
                    }),
                    other => Err(other),
                },
            };
        }

        let result = sqlx::query(
            r#"
            UPDATE documents SET
                body = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE collection = ?1 AND id = ?2 AND version = ?5
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(now)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::VersionConflict {
                collection: collection.to_string(),
                id: id.to_string(),
                expected: expected_version,
            });
        }

        Ok(expected_version + 1)
    }

    /// Deletes a document. Idempotent: deleting a missing document is a
    /// no-op that returns `false`.
    pub async fn delete(&self, collection: &str, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every document in a collection, ordered by id.
    pub async fn list<T: DeserializeOwned>(&self, collection: &str) -> DbResult<Vec<T>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = ?1
            ORDER BY id
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(bodies.len());
        for body in bodies {
            out.push(serde_json::from_str(&body)?);
        }
        Ok(out)
    }

    /// Collection query by a JSON field, e.g. `("$.status", "received")`.
    pub async fn find_by_field<T: DeserializeOwned>(
        &self,
        collection: &str,
        json_path: &str,
        value: &str,
    ) -> DbResult<Vec<T>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = ?1 AND json_extract(body, ?2) = ?3
            ORDER BY id
            "#,
        )
        .bind(collection)
        .bind(json_path)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(bodies.len());
        for body in bodies {
            out.push(serde_json::from_str(&body)?);
        }
        Ok(out)
    }

    /// Counts documents in a collection.
    pub async fn count(&self, collection: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE collection = ?1
            "#,
        )
        .bind(collection)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        status: String,
    }

    async fn store() -> DocumentStore {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.store().clone()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = store().await;
        let doc = Doc {
            name: "Widget".to_string(),
            status: "active".to_string(),
        };

        store.put("things", "t1", &doc).await.unwrap();
        let loaded: Option<Doc> = store.get("things", "t1").await.unwrap();

        assert_eq!(loaded, Some(doc));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = store().await;
        let loaded: Option<Doc> = store.get("things", "nope").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = store().await;
        let doc = Doc {
            name: "Widget".to_string(),
            status: "active".to_string(),
        };

        store.insert("things", "t1", &doc).await.unwrap();
        let err = store.insert("things", "t1", &doc).await.unwrap_err();

        assert!(matches!(err, DbError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_put_versioned_cas() {
        let store = store().await;
        let doc = Doc {
            name: "Widget".to_string(),
            status: "active".to_string(),
        };

        // Fresh create at expected version 0
        let v1 = store.put_versioned("things", "t1", &doc, 0).await.unwrap();
        assert_eq!(v1, 1);

        // Honest update
        let v2 = store.put_versioned("things", "t1", &doc, 1).await.unwrap();
        assert_eq!(v2, 2);

        // Stale writer loses
        let err = store.put_versioned("things", "t1", &doc, 1).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { expected: 1, .. }));

        // Racing creator loses too
        let err = store.put_versioned("things", "t1", &doc, 0).await.unwrap_err();
        assert!(matches!(err, DbError::VersionConflict { expected: 0, .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store().await;
        let doc = Doc {
            name: "Widget".to_string(),
            status: "active".to_string(),
        };

        store.put("things", "t1", &doc).await.unwrap();
        assert!(store.delete("things", "t1").await.unwrap());
        assert!(!store.delete("things", "t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let store = store().await;
        for i in 0..3 {
            let doc = Doc {
                name: format!("Widget {}", i),
                status: "active".to_string(),
            };
            store.put("things", &format!("t{}", i), &doc).await.unwrap();
        }

        let all: Vec<Doc> = store.list("things").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.count("things").await.unwrap(), 3);
        assert_eq!(store.count("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_field() {
        let store = store().await;
        store
            .put(
                "things",
                "t1",
                &Doc {
                    name: "A".to_string(),
                    status: "active".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .put(
                "things",
                "t2",
                &Doc {
                    name: "B".to_string(),
                    status: "retired".to_string(),
                },
            )
            .await
            .unwrap();

        let active: Vec<Doc> = store
            .find_by_field("things", "$.status", "active")
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "A");
    }
}
