//! # Sync Error Types
//!
//! Error types for mirroring, caching and reconciliation.
//!
//! ## Severity Model
//! Most sync failures are deliberately non-fatal to the user-facing flow:
//! a failed mirror write or cache refresh is logged with enough context
//! (business id, transaction id) for an operator to drive a manual resync,
//! while the primary order record stands.

use thiserror::Error;

/// Synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Underlying document store failure.
    #[error("Store error: {0}")]
    Db(#[from] tienda_db::DbError),

    /// Domain rule rejected an operation during replay.
    #[error("Domain error: {0}")]
    Domain(#[from] tienda_core::CoreError),

    /// Payload failed to (de)serialize.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file is missing a value or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// No settings document exists for the business.
    ///
    /// ## When This Occurs
    /// - The settings document was never seeded
    /// - A wrong business id is configured
    #[error("No settings document for business: {business_id}")]
    MissingSettings { business_id: String },

    /// A transaction referenced by a resync or replay does not exist in
    /// the primary store.
    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound { transaction_id: String },

    /// An external document carries an integer code no enum variant maps.
    #[error("Invalid {field} code: {code}")]
    InvalidCode { field: &'static str, code: i64 },

    /// A control channel closed unexpectedly.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
