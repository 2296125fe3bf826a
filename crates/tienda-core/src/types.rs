//! # Domain Types
//!
//! Core domain types for the Tienda storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (TXN-…)     │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  movements      │   │  method         │       │
//! │  │  has_iva        │   │  grand_total    │   │  amount_cents   │       │
//! │  │  iva_per_unit   │   │  status         │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  Enumerations carry STABLE integer codes: the external POS system      │
//! │  stores them as integers, so a variant's code must never change.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tax Model
//! Tax ("IVA") is not derived from a rate at sale time. Each product
//! carries a tax-inclusive unit price, a pre-computed per-unit tax amount
//! and a pre-computed tax-exclusive unit price. When `has_iva` is false the
//! tax fields are treated as zero regardless of their stored values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::movement::StockMovement;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (825 bps = 8.25%).
///
/// Stored on the product for display purposes only; tax amounts are never
/// derived from it at sale time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Category & Supplier
// =============================================================================

/// Product category reference, denormalized wherever products travel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Product supplier reference, denormalized wherever products travel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// Read-only to this subsystem apart from the stock figure: the catalog is
/// edited out-of-band by the POS/ERP side, and the staleness poller is what
/// picks those edits up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: String,

    /// Display name shown in the storefront and on order lines.
    pub name: String,

    /// Tax-inclusive unit price in cents.
    pub price_cents: i64,

    /// Whether this product bears tax at all.
    pub has_iva: bool,

    /// Pre-computed tax amount per unit, in cents.
    pub iva_per_unit_cents: i64,

    /// Pre-computed tax-exclusive unit price, in cents.
    pub price_without_iva_cents: i64,

    /// Tax rate in basis points (display only).
    pub iva_rate_bps: u32,

    /// Current stock figure.
    pub stock: i64,

    /// Category, denormalized.
    pub category: Category,

    /// Supplier, denormalized.
    pub supplier: Supplier,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the tax-inclusive unit price.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the per-unit tax amount, zero when the product bears no tax.
    #[inline]
    pub fn iva_per_unit(&self) -> Money {
        if self.has_iva {
            Money::from_cents(self.iva_per_unit_cents)
        } else {
            Money::zero()
        }
    }

    /// Returns the tax-exclusive unit price. For untaxed products this is
    /// the full price.
    #[inline]
    pub fn price_without_iva(&self) -> Money {
        if self.has_iva {
            Money::from_cents(self.price_without_iva_cents)
        } else {
            self.price()
        }
    }

    /// Returns the tax rate, zero when the product bears no tax.
    #[inline]
    pub fn iva_rate(&self) -> TaxRate {
        if self.has_iva {
            TaxRate::from_bps(self.iva_rate_bps)
        } else {
            TaxRate::zero()
        }
    }
}

// =============================================================================
// Status Enumerations
// =============================================================================
// Every enum here serializes by name inside our own documents, but crosses
// to the external POS system as its integer code. The codes are part of the
// external contract: NEVER renumber a variant.

/// Order status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order received, nothing started yet.
    #[default]
    Received,
    /// Order is being prepared.
    InPreparation,
    /// Ready for pickup or dispatch.
    Ready,
    /// Out for delivery.
    OnTheWay,
    /// Delivered to the customer.
    Delivered,
    /// Cancelled before completion.
    Cancelled,
}

impl OrderStatus {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            OrderStatus::Received => 0,
            OrderStatus::InPreparation => 1,
            OrderStatus::Ready => 2,
            OrderStatus::OnTheWay => 3,
            OrderStatus::Delivered => 4,
            OrderStatus::Cancelled => 5,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Received),
            1 => Some(OrderStatus::InPreparation),
            2 => Some(OrderStatus::Ready),
            3 => Some(OrderStatus::OnTheWay),
            4 => Some(OrderStatus::Delivered),
            5 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Derives the coarser fulfillment status.
    pub const fn fulfillment(&self) -> FulfillmentStatus {
        match self {
            OrderStatus::Delivered => FulfillmentStatus::Completed,
            OrderStatus::Cancelled => FulfillmentStatus::Cancelled,
            _ => FulfillmentStatus::Open,
        }
    }

    /// True if no further transitions are allowed.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Received => "received",
            OrderStatus::InPreparation => "in_preparation",
            OrderStatus::Ready => "ready",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Coarse fulfillment status, always derived from [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    Open,
    Completed,
    Cancelled,
}

impl FulfillmentStatus {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            FulfillmentStatus::Open => 0,
            FulfillmentStatus::Completed => 1,
            FulfillmentStatus::Cancelled => 2,
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Customer picks the order up; no address required.
    #[default]
    Pickup,
    /// Delivered to the customer's address.
    HomeDelivery,
}

impl DeliveryType {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            DeliveryType::Pickup => 0,
            DeliveryType::HomeDelivery => 1,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DeliveryType::Pickup),
            1 => Some(DeliveryType::HomeDelivery),
            _ => None,
        }
    }
}

/// Where the transaction originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Placed through the online storefront.
    #[default]
    OnlineSale,
    /// Rung up at the counter (mirrored in from the POS side).
    CounterSale,
}

impl TransactionType {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            TransactionType::OnlineSale => 0,
            TransactionType::CounterSale => 1,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TransactionType::OnlineSale),
            1 => Some(TransactionType::CounterSale),
            _ => None,
        }
    }
}

/// Partial-payment state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPaymentType {
    /// Nothing paid yet.
    #[default]
    None,
    /// Some money received, balance outstanding.
    Deposit,
    /// Paid in full.
    Settled,
}

impl PartialPaymentType {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            PartialPaymentType::None => 0,
            PartialPaymentType::Deposit => 1,
            PartialPaymentType::Settled => 2,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PartialPaymentType::None),
            1 => Some(PartialPaymentType::Deposit),
            2 => Some(PartialPaymentType::Settled),
            _ => None,
        }
    }
}

/// Sales channel stamped on every movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    /// The online storefront (this system's fixed marker).
    #[default]
    OnlineStore,
    /// The physical counter.
    Counter,
}

impl SalesChannel {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            SalesChannel::OnlineStore => 0,
            SalesChannel::Counter => 1,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SalesChannel::OnlineStore),
            1 => Some(SalesChannel::Counter),
            _ => None,
        }
    }
}

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    /// Stable integer code used by the external POS schema.
    pub const fn code(&self) -> i64 {
        match self {
            PaymentMethod::Cash => 0,
            PaymentMethod::Card => 1,
            PaymentMethod::Transfer => 2,
        }
    }

    /// Decodes an external integer code.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PaymentMethod::Cash),
            1 => Some(PaymentMethod::Card),
            2 => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a transaction.
/// A transaction can have multiple payments (deposit + balance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub method: PaymentMethod,
    /// Amount paid in cents.
    pub amount_cents: i64,
    /// External reference (card auth code, transfer folio, etc.).
    pub reference: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment with a fresh id.
    pub fn new(method: PaymentMethod, amount: Money, reference: Option<String>) -> Self {
        Payment {
            id: Uuid::new_v4().to_string(),
            method,
            amount_cents: amount.cents(),
            reference,
            received_at: Utc::now(),
        }
    }

    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Customer & Cart Input
// =============================================================================

/// Customer descriptor supplied by the web layer at checkout time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Client identity (account id or session-scoped id).
    pub client_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Required for home delivery, waived for pickup.
    pub address: Option<String>,
    pub delivery: DeliveryType,
    /// Recipient name for gift orders; when absent, lines are for the
    /// ordering customer.
    pub gift_recipient: Option<String>,
    /// Free-text preparation/delivery instructions.
    pub instructions: Option<String>,
}

/// One cart line as supplied by the cart source: a product reference and a
/// quantity. The core only ever consumes a snapshot of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

/// One stock shortfall found during the checkout stock check.
///
/// All shortfalls for a cart are collected before aborting, so the
/// customer sees every problem line at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub product_id: String,
    pub name: String,
    pub available: i64,
    pub requested: i64,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} — Available: {}, Requested: {}",
            self.name, self.available, self.requested
        )
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// The order aggregate: one checkout, priced and tax-annotated.
///
/// ## Invariants
/// - `grand_total_cents  = Σ movement line totals`
/// - `iva_amount_cents   = Σ movement tax totals`
/// - `amount_before_iva_cents = Σ movement tax-exclusive totals`
/// - `total_cost_cents   = grand_total_cents` (retail sales treat cost as
///   the sale price, not a margin calculation)
///
/// Created once by the builder; mutated afterwards only through the
/// status-transition operations below, never by re-running the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Structured id, assigned once at creation (`TXN-YYYYMMDD-xxxxxxxx`).
    pub id: String,
    pub business_id: String,
    pub client_id: String,
    pub client_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// One sale movement per cart line.
    pub movements: Vec<StockMovement>,
    pub grand_total_cents: i64,
    pub iva_amount_cents: i64,
    pub amount_before_iva_cents: i64,
    pub total_cost_cents: i64,
    pub status: OrderStatus,
    /// Derived from `status`; kept stored so queries and the mirror see it.
    pub fulfillment: FulfillmentStatus,
    pub delivery: DeliveryType,
    pub transaction_type: TransactionType,
    pub partial_payment: PartialPaymentType,
    pub payments: Vec<Payment>,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Generates a structured transaction id: `TXN-YYYYMMDD-xxxxxxxx`.
    ///
    /// The date prefix keeps ids scannable in operator tooling; the UUID
    /// suffix keeps them collision-free without coordination.
    pub fn generate_id(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("TXN-{}-{}", now.format("%Y%m%d"), &suffix[..8])
    }

    /// Returns the grand total as Money.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    /// Returns the tax amount as Money.
    #[inline]
    pub fn iva_amount(&self) -> Money {
        Money::from_cents(self.iva_amount_cents)
    }

    /// Returns the tax-exclusive amount as Money.
    #[inline]
    pub fn amount_before_iva(&self) -> Money {
        Money::from_cents(self.amount_before_iva_cents)
    }

    /// Total received across all payments, in cents.
    pub fn total_paid_cents(&self) -> i64 {
        self.payments.iter().map(|p| p.amount_cents).sum()
    }

    /// Advances the order status.
    ///
    /// ## Rules
    /// - Terminal states (Delivered, Cancelled) admit no transition
    /// - The status only moves forward, never backwards
    /// - Fulfillment status is re-derived, never set directly
    pub fn advance_status(&mut self, next: OrderStatus) -> CoreResult<()> {
        if self.status.is_terminal() || next.code() <= self.status.code() {
            return Err(CoreError::InvalidStatusTransition {
                transaction_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = next;
        self.fulfillment = next.fulfillment();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels the transaction.
    ///
    /// Allowed from any non-terminal state.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidStatusTransition {
                transaction_id: self.id.clone(),
                from: self.status.to_string(),
                to: OrderStatus::Cancelled.to_string(),
            });
        }

        self.status = OrderStatus::Cancelled;
        self.fulfillment = FulfillmentStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records a payment and re-derives the partial-payment state.
    pub fn record_payment(&mut self, payment: Payment) {
        self.payments.push(payment);

        let paid = self.total_paid_cents();
        self.partial_payment = if paid <= 0 {
            PartialPaymentType::None
        } else if paid < self.grand_total_cents {
            PartialPaymentType::Deposit
        } else {
            PartialPaymentType::Settled
        };
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Business Settings & Catalog Marker
// =============================================================================

/// Per-business configuration, read-mostly and cached.
///
/// Edited out-of-band (by the POS/ERP side or an operator); this core only
/// ever reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    pub business_id: String,
    pub business_name: String,
    /// When false, checkout skips the mirror step entirely.
    pub pos_integration_enabled: bool,
    /// When false, checkout skips the stock-check step.
    pub stock_validation_enabled: bool,
}

/// The catalog staleness marker: a single upstream document exposing one
/// timestamp, bumped externally whenever the catalog changes.
///
/// Read-only from this core's perspective; the poller compares it against
/// the value observed at its previous successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMarker {
    pub changed_at: DateTime<Utc>,
}

// =============================================================================
// Sync Outbox
// =============================================================================

/// Which best-effort checkout step an outbox entry replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStep {
    /// Write the translated transaction to the POS mirror path.
    Mirror,
    /// Apply the outgoing stock movements to the per-product ledgers.
    Ledger,
}

impl OutboxStep {
    /// Column value used by the outbox table.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutboxStep::Mirror => "mirror",
            OutboxStep::Ledger => "ledger",
        }
    }

    /// Parses a column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mirror" => Some(OutboxStep::Mirror),
            "ledger" => Some(OutboxStep::Ledger),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutboxStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry in the sync outbox queue.
///
/// Checkout enqueues one entry per best-effort step BEFORE attempting it,
/// so a crash or failure between the primary write and the mirror/ledger
/// writes leaves a durable record for the reconciliation worker. Entries
/// are keyed by transaction id and replays are idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: String,
    pub business_id: String,
    pub step: OutboxStep,
    /// The transaction this entry belongs to (the idempotency key).
    pub transaction_id: String,
    /// Step-specific JSON payload (the mirror document, or the movement
    /// list for the ledger step).
    pub payload: String,
    /// Number of attempts so far.
    pub attempts: i64,
    /// Last error message if an attempt failed.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the last attempt ran.
    pub attempted_at: Option<DateTime<Utc>>,
    /// When the step succeeded.
    pub done_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(OrderStatus::Received.code(), 0);
        assert_eq!(OrderStatus::Delivered.code(), 4);
        assert_eq!(OrderStatus::Cancelled.code(), 5);
        assert_eq!(OrderStatus::from_code(2), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::from_code(99), None);
    }

    #[test]
    fn test_fulfillment_derivation() {
        assert_eq!(OrderStatus::Received.fulfillment(), FulfillmentStatus::Open);
        assert_eq!(OrderStatus::OnTheWay.fulfillment(), FulfillmentStatus::Open);
        assert_eq!(
            OrderStatus::Delivered.fulfillment(),
            FulfillmentStatus::Completed
        );
        assert_eq!(
            OrderStatus::Cancelled.fulfillment(),
            FulfillmentStatus::Cancelled
        );
    }

    #[test]
    fn test_untaxed_product_reads_zero_tax() {
        let mut product = test_product();
        product.has_iva = false;
        product.iva_per_unit_cents = 1500;
        product.iva_rate_bps = 1600;

        assert_eq!(product.iva_per_unit(), Money::zero());
        assert_eq!(product.iva_rate(), TaxRate::zero());
        assert_eq!(product.price_without_iva(), product.price());
    }

    #[test]
    fn test_generate_id_shape() {
        let id = Transaction::generate_id(Utc::now());
        assert!(id.starts_with("TXN-"));
        // TXN- + 8 date chars + '-' + 8 hex chars
        assert_eq!(id.len(), 4 + 8 + 1 + 8);
    }

    #[test]
    fn test_advance_status_forward_only() {
        let mut txn = test_transaction();

        txn.advance_status(OrderStatus::InPreparation).unwrap();
        assert_eq!(txn.status, OrderStatus::InPreparation);
        assert_eq!(txn.fulfillment, FulfillmentStatus::Open);

        // Backwards is rejected
        assert!(txn.advance_status(OrderStatus::Received).is_err());

        txn.advance_status(OrderStatus::Delivered).unwrap();
        assert_eq!(txn.fulfillment, FulfillmentStatus::Completed);

        // Terminal states admit no transition
        assert!(txn.advance_status(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_cancel_from_open_state() {
        let mut txn = test_transaction();
        txn.cancel().unwrap();
        assert_eq!(txn.status, OrderStatus::Cancelled);
        assert_eq!(txn.fulfillment, FulfillmentStatus::Cancelled);
        assert!(txn.cancel().is_err());
    }

    #[test]
    fn test_record_payment_derives_partial_state() {
        let mut txn = test_transaction();
        assert_eq!(txn.partial_payment, PartialPaymentType::None);

        txn.record_payment(Payment::new(
            PaymentMethod::Cash,
            crate::Money::from_cents(100),
            None,
        ));
        assert_eq!(txn.partial_payment, PartialPaymentType::Deposit);

        txn.record_payment(Payment::new(
            PaymentMethod::Card,
            crate::Money::from_cents(100),
            None,
        ));
        assert_eq!(txn.partial_payment, PartialPaymentType::Settled);
        assert_eq!(txn.total_paid_cents(), 200);
    }

    fn test_transaction() -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Transaction::generate_id(now),
            business_id: "biz-1".to_string(),
            client_id: "client-1".to_string(),
            client_name: "Ana".to_string(),
            phone: "555-0101".to_string(),
            email: None,
            address: None,
            movements: Vec::new(),
            grand_total_cents: 200,
            iva_amount_cents: 30,
            amount_before_iva_cents: 170,
            total_cost_cents: 200,
            status: OrderStatus::Received,
            fulfillment: FulfillmentStatus::Open,
            delivery: DeliveryType::Pickup,
            transaction_type: TransactionType::OnlineSale,
            partial_payment: PartialPaymentType::None,
            payments: Vec::new(),
            instructions: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_shortfall_display() {
        let shortfall = Shortfall {
            product_id: "prod-1".to_string(),
            name: "Widget".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(shortfall.to_string(), "Widget — Available: 1, Requested: 2");
    }

    fn test_product() -> Product {
        Product {
            id: "prod-1".to_string(),
            name: "Widget".to_string(),
            price_cents: 10000,
            has_iva: true,
            iva_per_unit_cents: 1500,
            price_without_iva_cents: 8500,
            iva_rate_bps: 1600,
            stock: 10,
            category: Category::default(),
            supplier: Supplier::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
