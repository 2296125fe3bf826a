//! # Transaction Builder
//!
//! Turns a cart snapshot into a fully-priced, tax-annotated [`Transaction`].
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Per Cart Line                                        │
//! │                                                                         │
//! │  (product_id, quantity)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  look up product in the snapshot set ── missing ──► UnknownProduct     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  line_total = unit_price × qty                                         │
//! │       │                                                                 │
//! │       ├── has_iva:  iva_total = iva_per_unit × qty                     │
//! │       │             without_iva = price_without_iva × qty              │
//! │       │                                                                 │
//! │       └── no iva:   iva_total = 0                                      │
//! │                     without_iva = line_total                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  default flags (unpaid, unprinted, unselected, non-production)         │
//! │  zero discount · for_who · OnlineStore channel                         │
//! │                                                                         │
//! │  After all lines:                                                      │
//! │    grand_total       = Σ line_total                                    │
//! │    iva_amount        = Σ iva_total                                     │
//! │    amount_before_iva = Σ without_iva                                   │
//! │    total_cost        = grand_total                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The builder is pure: it reads the supplied snapshots and never touches
//! the live catalog, so a product edit racing a checkout cannot change what
//! the customer is charged.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::{CoreError, CoreResult};
use crate::movement::{SaleLine, StockMovement};
use crate::types::{
    CartLine, CustomerInfo, DeliveryType, FulfillmentStatus, OrderStatus, PartialPaymentType,
    Product, SalesChannel, Transaction, TransactionType,
};

/// Builds a [`Transaction`] from a cart snapshot and a customer descriptor.
///
/// ## Arguments
/// * `business_id` - the business the order belongs to
/// * `lines` - ordered cart lines (product id + quantity)
/// * `products` - the product snapshot set the cart was assembled against
/// * `customer` - customer identity, contact and delivery details
///
/// ## Errors
/// * `EmptyCart` when `lines` is empty (callers validate first; this is the
///   backstop)
/// * `UnknownProduct` when a line references a product missing from the
///   snapshot set
pub fn build_transaction(
    business_id: &str,
    lines: &[CartLine],
    products: &[Product],
    customer: &CustomerInfo,
) -> CoreResult<Transaction> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let by_id: HashMap<&str, &Product> =
        products.iter().map(|p| (p.id.as_str(), p)).collect();

    let now = Utc::now();
    let id = Transaction::generate_id(now);

    // Gift orders carry the recipient on every line; otherwise the line is
    // for the ordering customer.
    let for_who = customer
        .gift_recipient
        .clone()
        .unwrap_or_else(|| customer.name.clone());

    let mut movements = Vec::with_capacity(lines.len());
    let mut grand_total: i64 = 0;
    let mut iva_amount: i64 = 0;
    let mut amount_before_iva: i64 = 0;

    for line in lines {
        let product = by_id.get(line.product_id.as_str()).copied().ok_or_else(|| {
            CoreError::UnknownProduct {
                product_id: line.product_id.clone(),
            }
        })?;

        let quantity = line.quantity;
        let line_total = product.price().multiply_quantity(quantity);
        let iva_total = product.iva_per_unit().multiply_quantity(quantity);
        let without_iva = if product.has_iva {
            product.price_without_iva().multiply_quantity(quantity)
        } else {
            line_total
        };

        grand_total += line_total.cents();
        iva_amount += iva_total.cents();
        amount_before_iva += without_iva.cents();

        movements.push(StockMovement::sale(
            product,
            quantity,
            SaleLine {
                transaction_id: id.clone(),
                unit_price_cents: product.price_cents,
                line_total_cents: line_total.cents(),
                iva_total_cents: iva_total.cents(),
                line_total_without_iva_cents: without_iva.cents(),
                printed: false,
                paid: false,
                selected: false,
                production: false,
                discount_cents: 0,
                discount_reason: None,
                for_who: for_who.clone(),
                channel: SalesChannel::OnlineStore,
            },
        ));
    }

    Ok(Transaction {
        id,
        business_id: business_id.to_string(),
        client_id: customer.client_id.clone(),
        client_name: customer.name.clone(),
        phone: customer.phone.clone(),
        email: customer.email.clone(),
        address: customer.address.clone(),
        movements,
        grand_total_cents: grand_total,
        iva_amount_cents: iva_amount,
        amount_before_iva_cents: amount_before_iva,
        // Retail sales treat total cost as the sale price
        total_cost_cents: grand_total,
        status: OrderStatus::Received,
        fulfillment: FulfillmentStatus::Open,
        delivery: customer.delivery,
        transaction_type: TransactionType::OnlineSale,
        partial_payment: PartialPaymentType::None,
        payments: Vec::new(),
        instructions: customer.instructions.clone(),
        created_at: now,
        updated_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Supplier};

    fn product(id: &str, price: i64, has_iva: bool, iva: i64, without: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents: price,
            has_iva,
            iva_per_unit_cents: iva,
            price_without_iva_cents: without,
            iva_rate_bps: if has_iva { 1600 } else { 0 },
            stock: 100,
            category: Category::default(),
            supplier: Supplier::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            client_id: "client-1".to_string(),
            name: "Ana".to_string(),
            phone: "555-0101".to_string(),
            email: None,
            address: None,
            delivery: DeliveryType::Pickup,
            gift_recipient: None,
            instructions: None,
        }
    }

    #[test]
    fn test_taxed_line_pricing() {
        // unit price 100, iva/unit 15, without-iva 85, qty 2
        let products = vec![product("p1", 100, true, 15, 85)];
        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 2,
        }];

        let txn = build_transaction("biz-1", &lines, &products, &customer()).unwrap();
        let sale = txn.movements[0].as_sale().unwrap();

        assert_eq!(sale.line_total_cents, 200);
        assert_eq!(sale.iva_total_cents, 30);
        assert_eq!(sale.line_total_without_iva_cents, 170);
    }

    #[test]
    fn test_untaxed_line_pricing() {
        // unit price 50, no iva, qty 3
        let products = vec![product("p1", 50, false, 0, 0)];
        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 3,
        }];

        let txn = build_transaction("biz-1", &lines, &products, &customer()).unwrap();
        let sale = txn.movements[0].as_sale().unwrap();

        assert_eq!(sale.line_total_cents, 150);
        assert_eq!(sale.iva_total_cents, 0);
        assert_eq!(sale.line_total_without_iva_cents, 150);
    }

    #[test]
    fn test_totals_match_movement_sums() {
        let products = vec![
            product("p1", 100, true, 15, 85),
            product("p2", 50, false, 0, 0),
            product("p3", 325, true, 45, 280),
        ];
        let lines = vec![
            CartLine {
                product_id: "p1".to_string(),
                quantity: 2,
            },
            CartLine {
                product_id: "p2".to_string(),
                quantity: 3,
            },
            CartLine {
                product_id: "p3".to_string(),
                quantity: 1,
            },
        ];

        let txn = build_transaction("biz-1", &lines, &products, &customer()).unwrap();

        let line_sum: i64 = txn
            .movements
            .iter()
            .filter_map(|m| m.as_sale())
            .map(|s| s.line_total_cents)
            .sum();
        let iva_sum: i64 = txn
            .movements
            .iter()
            .filter_map(|m| m.as_sale())
            .map(|s| s.iva_total_cents)
            .sum();
        let without_sum: i64 = txn
            .movements
            .iter()
            .filter_map(|m| m.as_sale())
            .map(|s| s.line_total_without_iva_cents)
            .sum();

        assert_eq!(txn.grand_total_cents, line_sum);
        assert_eq!(txn.iva_amount_cents, iva_sum);
        assert_eq!(txn.amount_before_iva_cents, without_sum);
        assert_eq!(txn.total_cost_cents, txn.grand_total_cents);
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let products = vec![product("p1", 100, true, 15, 85)];
        let result = build_transaction("biz-1", &[], &products, &customer());
        assert!(matches!(result, Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_unknown_product_is_a_hard_error() {
        let products = vec![product("p1", 100, true, 15, 85)];
        let lines = vec![
            CartLine {
                product_id: "p1".to_string(),
                quantity: 1,
            },
            CartLine {
                product_id: "missing".to_string(),
                quantity: 1,
            },
        ];

        let result = build_transaction("biz-1", &lines, &products, &customer());
        assert!(matches!(
            result,
            Err(CoreError::UnknownProduct { product_id }) if product_id == "missing"
        ));
    }

    #[test]
    fn test_gift_recipient_stamped_on_lines() {
        let products = vec![product("p1", 100, true, 15, 85)];
        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 1,
        }];

        let mut gift = customer();
        gift.gift_recipient = Some("Luis".to_string());

        let txn = build_transaction("biz-1", &lines, &products, &gift).unwrap();
        assert_eq!(txn.movements[0].as_sale().unwrap().for_who, "Luis");

        let txn = build_transaction("biz-1", &lines, &products, &customer()).unwrap();
        assert_eq!(txn.movements[0].as_sale().unwrap().for_who, "Ana");
    }

    #[test]
    fn test_default_flags_and_channel() {
        let products = vec![product("p1", 100, true, 15, 85)];
        let lines = vec![CartLine {
            product_id: "p1".to_string(),
            quantity: 1,
        }];

        let txn = build_transaction("biz-1", &lines, &products, &customer()).unwrap();
        let sale = txn.movements[0].as_sale().unwrap();

        assert!(!sale.printed);
        assert!(!sale.paid);
        assert!(!sale.selected);
        assert!(!sale.production);
        assert_eq!(sale.discount_cents, 0);
        assert_eq!(sale.channel, SalesChannel::OnlineStore);
        assert_eq!(sale.transaction_id, txn.id);
    }
}
