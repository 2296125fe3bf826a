//! # Stock Movements & Ledger
//!
//! The audit-trail model for everything that happens to a product's stock.
//!
//! ## One Entity, Two Events
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       StockMovement                                     │
//! │                                                                         │
//! │  Envelope (every movement):                                            │
//! │    id · occurred_at · product snapshot · quantity                      │
//! │                                                                         │
//! │  MovementKind::Sale               MovementKind::CountAdjustment        │
//! │  ──────────────────               ──────────────────────────────       │
//! │  transaction_id                   expected_stock                       │
//! │  unit_price / line totals         difference_in_stock (signed)         │
//! │  iva totals                       current_stock_count                  │
//! │  printed/paid/selected flags                                           │
//! │  discount · for_who · channel                                          │
//! │                                                                         │
//! │  The payloads are DISJOINT: a sale never carries recount fields and    │
//! │  a recount never carries pricing, so neither half can be half-filled.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! The movement embeds a denormalized copy of the product, not a live
//! reference. Editing the product afterwards must never change what a
//! historical movement says was sold or counted.
//!
//! ## The Ledger
//! `StockItem` is the per-product ledger: the authoritative current
//! quantity plus three append-only sequences (incoming, outgoing, stock
//! counts). The quantity is mutated ONLY through `add_incoming`,
//! `add_outgoing` and `add_stock_count`. The `version` field is the
//! optimistic-concurrency token checked by the document store on save, so
//! two concurrent checkouts cannot both decrement from the same base state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Category, Product, SalesChannel, Supplier};

// =============================================================================
// Product Snapshot
// =============================================================================

/// Denormalized copy of a product, frozen at movement creation time.
///
/// Tax fields are normalized on capture: an untaxed product snapshots with
/// zero tax amount and its full price as the tax-exclusive price, so
/// downstream math never has to re-check `has_iva`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub has_iva: bool,
    pub iva_per_unit_cents: i64,
    pub price_without_iva_cents: i64,
    pub iva_rate_bps: u32,
    pub category: Category,
    pub supplier: Supplier,
}

impl ProductSnapshot {
    /// Captures a snapshot of a product, normalizing the tax fields.
    pub fn capture(product: &Product) -> Self {
        ProductSnapshot {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price_cents: product.price_cents,
            has_iva: product.has_iva,
            iva_per_unit_cents: product.iva_per_unit().cents(),
            price_without_iva_cents: product.price_without_iva().cents(),
            iva_rate_bps: product.iva_rate().bps(),
            category: product.category.clone(),
            supplier: product.supplier.clone(),
        }
    }

    /// Returns the tax-inclusive unit price.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Movement Kinds
// =============================================================================

/// Payload of a sale line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// The transaction this line belongs to. Also the idempotency key for
    /// ledger reconciliation.
    pub transaction_id: String,
    /// Unit price at time of sale, in cents (frozen).
    pub unit_price_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    /// Pre-computed per-unit tax × quantity; zero for untaxed products.
    pub iva_total_cents: i64,
    /// Tax-exclusive total; equals the line total for untaxed products.
    pub line_total_without_iva_cents: i64,
    /// Receipt printed for this line.
    pub printed: bool,
    /// Line settled.
    pub paid: bool,
    /// Line selected in operator tooling.
    pub selected: bool,
    /// Internal production consumption, excluded from sold totals.
    pub production: bool,
    /// Discount applied to this line, in cents.
    pub discount_cents: i64,
    pub discount_reason: Option<String>,
    /// Recipient name for gift orders, otherwise the ordering customer.
    pub for_who: String,
    /// Where the sale originated.
    pub channel: SalesChannel,
}

/// Payload of an inventory recount event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountAdjustment {
    /// What the ledger said the stock should have been.
    pub expected_stock: i64,
    /// Signed delta to apply to the ledger quantity. Supplied by the
    /// caller, not derived here; its correctness is the caller's
    /// responsibility.
    pub difference_in_stock: i64,
    /// What was physically counted.
    pub current_stock_count: i64,
}

/// The event payload of a movement: a sale line or a recount adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MovementKind {
    Sale(SaleLine),
    CountAdjustment(CountAdjustment),
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One immutable line-item event against a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    /// Frozen product copy; later product edits never alter this.
    pub product: ProductSnapshot,
    pub quantity: i64,
    #[serde(flatten)]
    pub kind: MovementKind,
}

impl StockMovement {
    /// Creates a sale movement with a fresh id.
    pub fn sale(product: &Product, quantity: i64, line: SaleLine) -> Self {
        StockMovement {
            id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            product: ProductSnapshot::capture(product),
            quantity,
            kind: MovementKind::Sale(line),
        }
    }

    /// Creates a recount movement with a fresh id.
    ///
    /// `counted` becomes both the movement quantity and the recorded
    /// physical count.
    pub fn count_adjustment(
        product: &Product,
        counted: i64,
        expected_stock: i64,
        difference_in_stock: i64,
    ) -> Self {
        StockMovement {
            id: Uuid::new_v4().to_string(),
            occurred_at: Utc::now(),
            product: ProductSnapshot::capture(product),
            quantity: counted,
            kind: MovementKind::CountAdjustment(CountAdjustment {
                expected_stock,
                difference_in_stock,
                current_stock_count: counted,
            }),
        }
    }

    /// Returns the sale payload, if this is a sale.
    pub fn as_sale(&self) -> Option<&SaleLine> {
        match &self.kind {
            MovementKind::Sale(line) => Some(line),
            MovementKind::CountAdjustment(_) => None,
        }
    }

    /// Returns the recount payload, if this is a recount.
    pub fn as_count_adjustment(&self) -> Option<&CountAdjustment> {
        match &self.kind {
            MovementKind::Sale(_) => None,
            MovementKind::CountAdjustment(adj) => Some(adj),
        }
    }

    /// True for sale movements flagged as internal production consumption.
    pub fn is_production(&self) -> bool {
        self.as_sale().map(|line| line.production).unwrap_or(false)
    }
}

// =============================================================================
// Stock Item (the ledger)
// =============================================================================

/// Per-product stock ledger.
///
/// ## Lifecycle
/// Created lazily on the first movement against a product that has no
/// ledger yet, seeded from the product's stock figure. Updated on every
/// sale. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItem {
    pub product_id: String,
    /// Authoritative current quantity. Mutated only by the three `add_*`
    /// operations below.
    pub quantity: i64,
    /// Append-only receipts of stock.
    pub incoming: Vec<StockMovement>,
    /// Append-only sales and production draws.
    pub outgoing: Vec<StockMovement>,
    /// Append-only recount events.
    pub stock_counts: Vec<StockMovement>,
    /// Running total of physically counted units across recounts.
    pub accumulated_count: i64,
    /// Optimistic-concurrency token; bumped by the document store on save.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Creates a ledger for a product, seeded from its stock figure.
    pub fn seed(product: &Product) -> Self {
        let now = Utc::now();
        StockItem {
            product_id: product.id.clone(),
            quantity: product.stock,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            stock_counts: Vec::new(),
            accumulated_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a stock receipt and increments the quantity.
    pub fn add_incoming(&mut self, movement: StockMovement) -> CoreResult<()> {
        Self::require_sale_shaped(&movement)?;

        self.quantity += movement.quantity;
        self.incoming.push(movement);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Appends an outgoing sale and decrements the quantity.
    ///
    /// The resulting quantity is floored at zero: negative stock is not
    /// representable. The clamp is silent, which can mask over-selling;
    /// the recount flow is how the figure gets corrected.
    pub fn add_outgoing(&mut self, movement: StockMovement) -> CoreResult<()> {
        Self::require_sale_shaped(&movement)?;

        self.quantity = (self.quantity - movement.quantity).max(0);
        self.outgoing.push(movement);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Appends a recount event.
    ///
    /// The accumulated count grows by the counted quantity; the ledger
    /// quantity moves by the caller-supplied signed difference.
    pub fn add_stock_count(&mut self, movement: StockMovement) -> CoreResult<()> {
        let adjustment = match movement.as_count_adjustment() {
            Some(adj) => adj,
            None => {
                return Err(CoreError::InvalidMovement {
                    reason: "expected a count adjustment, got a sale".to_string(),
                })
            }
        };

        if movement.quantity <= 0 {
            return Err(CoreError::InvalidMovement {
                reason: "counted quantity must be positive".to_string(),
            });
        }

        self.accumulated_count += movement.quantity;
        self.quantity += adjustment.difference_in_stock;
        self.stock_counts.push(movement);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// True if an outgoing sale for the given transaction is already on
    /// the ledger. Used by the reconciliation worker to keep ledger
    /// replays idempotent.
    pub fn contains_sale(&self, transaction_id: &str) -> bool {
        self.outgoing
            .iter()
            .filter_map(|m| m.as_sale())
            .any(|line| line.transaction_id == transaction_id)
    }

    /// Units sold: sum of outgoing movements, excluding production draws.
    pub fn total_sold(&self) -> i64 {
        self.outgoing
            .iter()
            .filter(|m| !m.is_production())
            .map(|m| m.quantity)
            .sum()
    }

    /// Units purchased: sum of incoming movements.
    pub fn total_purchased(&self) -> i64 {
        self.incoming.iter().map(|m| m.quantity).sum()
    }

    /// Value of current stock at the given unit price.
    pub fn stock_value(&self, unit_price: Money) -> Money {
        unit_price.multiply_quantity(self.quantity)
    }

    fn require_sale_shaped(movement: &StockMovement) -> CoreResult<()> {
        if movement.as_sale().is_none() {
            return Err(CoreError::InvalidMovement {
                reason: "expected a sale movement, got a count adjustment".to_string(),
            });
        }
        if movement.quantity <= 0 {
            return Err(CoreError::InvalidMovement {
                reason: "quantity must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Supplier};

    fn test_product(stock: i64) -> Product {
        Product {
            id: "prod-1".to_string(),
            name: "Widget".to_string(),
            price_cents: 10000,
            has_iva: true,
            iva_per_unit_cents: 1500,
            price_without_iva_cents: 8500,
            iva_rate_bps: 1600,
            stock,
            category: Category {
                id: "cat-1".to_string(),
                name: "Widgets".to_string(),
            },
            supplier: Supplier {
                id: "sup-1".to_string(),
                name: "Acme".to_string(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale_movement(product: &Product, quantity: i64, production: bool) -> StockMovement {
        StockMovement::sale(
            product,
            quantity,
            SaleLine {
                transaction_id: "TXN-20260805-abcd1234".to_string(),
                unit_price_cents: product.price_cents,
                line_total_cents: product.price_cents * quantity,
                iva_total_cents: product.iva_per_unit().cents() * quantity,
                line_total_without_iva_cents: product.price_without_iva().cents() * quantity,
                printed: false,
                paid: false,
                selected: false,
                production,
                discount_cents: 0,
                discount_reason: None,
                for_who: "Ana".to_string(),
                channel: SalesChannel::OnlineStore,
            },
        )
    }

    #[test]
    fn test_seed_from_product_stock() {
        let ledger = StockItem::seed(&test_product(7));
        assert_eq!(ledger.quantity, 7);
        assert_eq!(ledger.version, 0);
        assert!(ledger.incoming.is_empty());
    }

    #[test]
    fn test_incoming_increments_quantity() {
        let product = test_product(2);
        let mut ledger = StockItem::seed(&product);

        ledger.add_incoming(sale_movement(&product, 5, false)).unwrap();

        assert_eq!(ledger.quantity, 7);
        assert_eq!(ledger.total_purchased(), 5);
    }

    #[test]
    fn test_outgoing_clamps_at_zero() {
        let product = test_product(1);
        let mut ledger = StockItem::seed(&product);

        ledger.add_outgoing(sale_movement(&product, 5, false)).unwrap();

        // 1 - 5 floors at 0, never negative
        assert_eq!(ledger.quantity, 0);
        assert_eq!(ledger.outgoing.len(), 1);
    }

    #[test]
    fn test_total_sold_excludes_production() {
        let product = test_product(20);
        let mut ledger = StockItem::seed(&product);

        ledger.add_outgoing(sale_movement(&product, 3, false)).unwrap();
        ledger.add_outgoing(sale_movement(&product, 2, true)).unwrap();

        assert_eq!(ledger.total_sold(), 3);
        assert_eq!(ledger.quantity, 15);
    }

    #[test]
    fn test_stock_count_applies_signed_difference() {
        let product = test_product(10);
        let mut ledger = StockItem::seed(&product);

        // Physical count found 8 where the ledger expected 10
        let recount = StockMovement::count_adjustment(&product, 8, 10, -2);
        ledger.add_stock_count(recount).unwrap();

        assert_eq!(ledger.quantity, 8);
        assert_eq!(ledger.accumulated_count, 8);
        assert_eq!(ledger.stock_counts.len(), 1);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let product = test_product(10);
        let mut ledger = StockItem::seed(&product);

        let recount = StockMovement::count_adjustment(&product, 8, 10, -2);
        assert!(ledger.add_outgoing(recount).is_err());

        let sale = sale_movement(&product, 1, false);
        assert!(ledger.add_stock_count(sale).is_err());
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        let product = test_product(10);
        let mut ledger = StockItem::seed(&product);

        let sale = sale_movement(&product, 0, false);
        assert!(ledger.add_outgoing(sale).is_err());
        assert_eq!(ledger.quantity, 10);
    }

    #[test]
    fn test_contains_sale_matches_transaction() {
        let product = test_product(10);
        let mut ledger = StockItem::seed(&product);

        ledger.add_outgoing(sale_movement(&product, 1, false)).unwrap();

        assert!(ledger.contains_sale("TXN-20260805-abcd1234"));
        assert!(!ledger.contains_sale("TXN-20260805-ffff0000"));
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut product = test_product(10);
        let movement = sale_movement(&product, 1, false);

        product.name = "Renamed".to_string();
        product.price_cents = 99999;

        assert_eq!(movement.product.name, "Widget");
        assert_eq!(movement.product.price_cents, 10000);
    }

    #[test]
    fn test_snapshot_normalizes_untaxed_products() {
        let mut product = test_product(10);
        product.has_iva = false;
        product.iva_per_unit_cents = 1500;

        let snapshot = ProductSnapshot::capture(&product);
        assert_eq!(snapshot.iva_per_unit_cents, 0);
        assert_eq!(snapshot.price_without_iva_cents, snapshot.price_cents);
    }

    #[test]
    fn test_stock_value() {
        let product = test_product(4);
        let ledger = StockItem::seed(&product);
        assert_eq!(ledger.stock_value(product.price()).cents(), 40000);
    }
}
