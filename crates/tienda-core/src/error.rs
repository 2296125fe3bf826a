//! # Error Types
//!
//! Domain-specific error types for tienda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tienda-core errors (this file)                                        │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tienda-db errors (separate crate)                                     │
//! │  └── DbError          - Document store failures                        │
//! │                                                                         │
//! │  tienda-sync errors (separate crate)                                   │
//! │  └── SyncError        - Mirror/cache/reconciliation failures           │
//! │                                                                         │
//! │  tienda-checkout errors (separate crate)                               │
//! │  └── CheckoutError    - What the web layer sees                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CheckoutError → Caller  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, transaction id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line references a product that is not in the supplied
    /// snapshot set.
    ///
    /// ## When This Occurs
    /// - Product was deleted upstream after the cart was assembled
    /// - The catalog snapshot is stale and missing a new product
    #[error("Unknown product in cart: {product_id}")]
    UnknownProduct { product_id: String },

    /// The cart handed to the builder is empty.
    ///
    /// Callers are expected to reject empty carts during validation, so
    /// hitting this means a caller skipped that step.
    #[error("Cart is empty")]
    EmptyCart,

    /// A stock movement is not acceptable for the requested ledger
    /// operation.
    ///
    /// ## When This Occurs
    /// - Movement quantity is zero or negative
    /// - A count adjustment was passed to `add_incoming`/`add_outgoing`
    /// - A sale line was passed to `add_stock_count`
    #[error("Invalid stock movement: {reason}")]
    InvalidMovement { reason: String },

    /// A status transition is not allowed from the transaction's current
    /// state.
    ///
    /// ## When This Occurs
    /// - Advancing a delivered or cancelled transaction
    /// - Moving the status backwards
    #[error("Transaction {transaction_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        transaction_id: String,
        from: String,
        to: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid id, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownProduct {
            product_id: "prod-9".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown product in cart: prod-9");

        let err = CoreError::InvalidMovement {
            reason: "quantity must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid stock movement: quantity must be positive"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "client_name".to_string(),
        };
        assert_eq!(err.to_string(), "client_name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "phone".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
