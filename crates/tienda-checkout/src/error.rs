//! # Checkout Error Types
//!
//! The error taxonomy the web layer sees.
//!
//! ## Severity Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Severity                             │
//! │                                                                         │
//! │  SURFACED TO THE CALLER (checkout aborts, no order exists):            │
//! │  ├── ValidationFailed   field-level list, no side effects              │
//! │  ├── StockInsufficient  every shortfall, no side effects               │
//! │  └── PersistenceFailed  primary write failed, retry-safe message       │
//! │                                                                         │
//! │  LOGGED ONLY (the order stands, reconciliation heals):                 │
//! │  ├── mirror write failures  → outbox + ReconciliationWorker            │
//! │  ├── ledger update failures → outbox + ReconciliationWorker            │
//! │  └── cart clearing failures → logged with client id                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use tienda_core::{FieldError, Shortfall};

/// Formats a shortfall list for the aggregated user-facing message.
fn shortfall_summary(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Formats a field error list for the aggregated user-facing message.
fn field_summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors a checkout can abort with.
///
/// Only three shapes ever reach the caller; everything past the primary
/// write is best-effort and handled internally.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Bad or missing checkout input. Recoverable, user-facing, no side
    /// effects.
    #[error("Validation failed: {}", field_summary(.errors))]
    ValidationFailed { errors: Vec<FieldError> },

    /// One or more cart lines exceed available stock. Recoverable,
    /// user-facing, no side effects. Every shortfall is listed, not just
    /// the first.
    #[error("Insufficient stock: {}", shortfall_summary(.shortfalls))]
    StockInsufficient { shortfalls: Vec<Shortfall> },

    /// The primary order write (or a read it depends on) failed. Fatal to
    /// this checkout; the caller shows a generic retry-safe message.
    #[error("Order could not be saved, please retry")]
    PersistenceFailed {
        #[source]
        source: tienda_db::DbError,
    },
}

impl CheckoutError {
    /// Wraps a store failure from the pre-mirror phase.
    pub fn persistence(source: tienda_db::DbError) -> Self {
        CheckoutError::PersistenceFailed { source }
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_message_enumerates_every_shortfall() {
        let err = CheckoutError::StockInsufficient {
            shortfalls: vec![
                Shortfall {
                    product_id: "p1".to_string(),
                    name: "Widget".to_string(),
                    available: 1,
                    requested: 2,
                },
                Shortfall {
                    product_id: "p2".to_string(),
                    name: "Gadget".to_string(),
                    available: 0,
                    requested: 4,
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("Widget — Available: 1, Requested: 2"));
        assert!(message.contains("Gadget — Available: 0, Requested: 4"));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = CheckoutError::ValidationFailed {
            errors: vec![FieldError {
                field: "phone".to_string(),
                message: "phone is required".to_string(),
            }],
        };
        assert!(err.to_string().contains("phone: phone is required"));
    }

    #[test]
    fn test_persistence_message_is_generic() {
        let err = CheckoutError::persistence(tienda_db::DbError::PoolExhausted);
        // No internals leak into the user-facing message
        assert_eq!(err.to_string(), "Order could not be saved, please retry");
    }
}
