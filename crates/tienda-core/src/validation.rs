//! # Validation Module
//!
//! Checkout input validation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web layer                                                    │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (first checkout state)                           │
//! │  ├── Cart non-empty, quantity bounds                                   │
//! │  ├── Required customer/contact fields                                  │
//! │  └── Delivery-specific fields (address for home delivery)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Builder & ledger (typed invariants)                          │
//! │                                                                         │
//! │  All failures are collected into ONE field-level list before the       │
//! │  checkout aborts, so the customer fixes the form in one pass.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{CartLine, CustomerInfo, DeliveryType};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// One field-level validation failure, suitable for direct display next to
/// the offending form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// =============================================================================
// Checkout Validation
// =============================================================================

/// Validates checkout input, collecting every problem before returning.
///
/// ## Rules
/// - Cart must be non-empty and within size bounds
/// - Every line quantity must be within bounds
/// - Client name and phone are required
/// - Address is required for home delivery, waived for pickup
pub fn validate_checkout(lines: &[CartLine], customer: &CustomerInfo) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if lines.is_empty() {
        errors.push(FieldError::new("cart", "cart is empty"));
    }
    if lines.len() > MAX_CART_ITEMS {
        errors.push(FieldError::new(
            "cart",
            format!("cart cannot have more than {} lines", MAX_CART_ITEMS),
        ));
    }
    for line in lines {
        if validate_quantity(line.quantity).is_err() {
            errors.push(FieldError::new(
                "quantity",
                format!(
                    "quantity for {} must be between 1 and {}",
                    line.product_id, MAX_ITEM_QUANTITY
                ),
            ));
        }
    }

    if customer.name.trim().is_empty() {
        errors.push(FieldError::new("name", "name is required"));
    }
    if customer.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "phone is required"));
    }

    if customer.delivery == DeliveryType::HomeDelivery {
        let missing = customer
            .address
            .as_deref()
            .map(|a| a.trim().is_empty())
            .unwrap_or(true);
        if missing {
            errors.push(FieldError::new(
                "address",
                "address is required for home delivery",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// Zero is allowed (free items); negative is not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a document id.
pub fn validate_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    if id.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(delivery: DeliveryType, address: Option<&str>) -> CustomerInfo {
        CustomerInfo {
            client_id: "client-1".to_string(),
            name: "Ana".to_string(),
            phone: "555-0101".to_string(),
            email: None,
            address: address.map(|a| a.to_string()),
            delivery,
            gift_recipient: None,
            instructions: None,
        }
    }

    fn one_line() -> Vec<CartLine> {
        vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 1,
        }]
    }

    #[test]
    fn test_valid_pickup_checkout() {
        let result = validate_checkout(&one_line(), &customer(DeliveryType::Pickup, None));
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_cart_rejected() {
        let errors = validate_checkout(&[], &customer(DeliveryType::Pickup, None)).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "cart"));
    }

    #[test]
    fn test_home_delivery_requires_address() {
        let errors =
            validate_checkout(&one_line(), &customer(DeliveryType::HomeDelivery, None)).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "address"));

        let blank =
            validate_checkout(&one_line(), &customer(DeliveryType::HomeDelivery, Some("  ")));
        assert!(blank.is_err());

        let ok = validate_checkout(
            &one_line(),
            &customer(DeliveryType::HomeDelivery, Some("Av. Juárez 10")),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_all_errors_collected() {
        let mut c = customer(DeliveryType::HomeDelivery, None);
        c.name = String::new();
        c.phone = String::new();

        let errors = validate_checkout(&[], &c).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"cart"));
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"phone"));
        assert!(fields.contains(&"address"));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("prod-1").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id(&"x".repeat(200)).is_err());
    }
}
