//! # Schema Translator
//!
//! Maps the internal `Transaction`/`StockMovement`/`Product` shapes into the
//! external POS system's document shape.
//!
//! ## Mapping Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Internal ──► External                                │
//! │                                                                         │
//! │  Field names change entirely:                                          │
//! │    client_id          → clientID                                       │
//! │    printed            → prePrinted                                     │
//! │    line_total_cents   → total                                          │
//! │                                                                         │
//! │  Enumerations cross as STABLE INTEGER CODES, never names:              │
//! │    OrderStatus::Ready → 2                                              │
//! │    DeliveryType::HomeDelivery → 1                                      │
//! │                                                                         │
//! │  Nested objects expand into plain key/value sub-documents:             │
//! │    product.category → { "categoryID": …, "name": … }                   │
//! │                                                                         │
//! │  The external movement record is FLAT: one record type serves both     │
//! │  sales and recounts, so a sale carries zeroed recount fields and a     │
//! │  recount carries zeroed pricing fields.                                │
//! │                                                                         │
//! │  TOTALITY: every field the external system expects has a source.      │
//! │  When the internal model has no equivalent the field is emitted with  │
//! │  its documented neutral value (empty string / 0 / false), NEVER        │
//! │  omitted. An omission is silent data loss on the external side.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Translation is pure and cannot fail; only the subsequent mirror write
//! can. The reverse direction (`restore_transaction`) exists for testing
//! round-trip safety and for operator verification after a manual resync;
//! production flow is strictly one-directional.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use tienda_core::{
    CountAdjustment, CustomerInfo, DeliveryType, MovementKind, OrderStatus, PartialPaymentType,
    Payment, PaymentMethod, Product, ProductSnapshot, SaleLine, SalesChannel, StockMovement,
    Transaction, TransactionType,
};

// =============================================================================
// External Document Shapes
// =============================================================================
// The correspondence below is a fixed, hand-maintained, exhaustive table.
// Renaming or renumbering anything here breaks the external consumer.

/// External category sub-document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalCategory {
    #[serde(rename = "categoryID", default)]
    pub category_id: String,
    #[serde(default)]
    pub name: String,
}

/// External supplier sub-document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalSupplier {
    #[serde(rename = "supplierID", default)]
    pub supplier_id: String,
    #[serde(default)]
    pub name: String,
}

/// External product sub-document, fully denormalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalProduct {
    #[serde(rename = "productID", default)]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: i64,
    #[serde(rename = "hasIVA", default)]
    pub has_iva: bool,
    #[serde(default)]
    pub iva: i64,
    #[serde(rename = "priceWithoutIVA", default)]
    pub price_without_iva: i64,
    #[serde(rename = "ivaRate", default)]
    pub iva_rate: i64,
    /// Live stock figure; movement snapshots have none, so it defaults to 0.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: ExternalCategory,
    #[serde(default)]
    pub supplier: ExternalSupplier,
}

/// External movement record: the POS system's flat line-item shape, shared
/// between sales and stock recounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalMovement {
    #[serde(rename = "movementID", default)]
    pub movement_id: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub product: ExternalProduct,
    #[serde(default)]
    pub quantity: i64,
    /// Unit price.
    #[serde(default)]
    pub price: i64,
    /// Line total.
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub iva: i64,
    #[serde(rename = "totalWithoutIVA", default)]
    pub total_without_iva: i64,
    #[serde(rename = "prePrinted", default)]
    pub pre_printed: bool,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(rename = "isProduction", default)]
    pub is_production: bool,
    #[serde(default)]
    pub discount: i64,
    #[serde(rename = "discountReason", default)]
    pub discount_reason: String,
    #[serde(rename = "forWho", default)]
    pub for_who: String,
    /// Sales channel integer code.
    #[serde(default)]
    pub channel: i64,
    /// Recount fields; zero on sale lines.
    #[serde(rename = "expectedStock", default)]
    pub expected_stock: i64,
    #[serde(rename = "differenceInStock", default)]
    pub difference_in_stock: i64,
    #[serde(rename = "currentStockCount", default)]
    pub current_stock_count: i64,
}

/// External payment record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalPayment {
    #[serde(rename = "paymentID", default)]
    pub payment_id: String,
    /// Payment method integer code.
    #[serde(default)]
    pub method: i64,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub date: String,
}

/// External transaction document, as written to `{businessId}/transaction`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalTransaction {
    #[serde(rename = "transactionID", default)]
    pub transaction_id: String,
    #[serde(rename = "businessID", default)]
    pub business_id: String,
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    #[serde(rename = "clientName", default)]
    pub client_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub date: String,
    /// The POS side calls the line list "products".
    #[serde(default)]
    pub products: Vec<ExternalMovement>,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub iva: i64,
    #[serde(rename = "subTotal", default)]
    pub sub_total: i64,
    #[serde(rename = "totalCost", default)]
    pub total_cost: i64,
    /// Order status integer code.
    #[serde(default)]
    pub status: i64,
    /// Fulfillment status integer code.
    #[serde(default)]
    pub fulfillment: i64,
    /// Transaction type integer code.
    #[serde(rename = "type", default)]
    pub transaction_type: i64,
    /// Partial-payment integer code.
    #[serde(rename = "partialPayment", default)]
    pub partial_payment: i64,
    /// Delivery type integer code.
    #[serde(rename = "deliveryType", default)]
    pub delivery_type: i64,
    #[serde(default)]
    pub payments: Vec<ExternalPayment>,
    #[serde(default)]
    pub instructions: String,
}

// =============================================================================
// Internal ──► External
// =============================================================================

/// Translates a product snapshot into the external product sub-document.
pub fn translate_snapshot(snapshot: &ProductSnapshot) -> ExternalProduct {
    ExternalProduct {
        product_id: snapshot.product_id.clone(),
        name: snapshot.name.clone(),
        price: snapshot.price_cents,
        has_iva: snapshot.has_iva,
        iva: snapshot.iva_per_unit_cents,
        price_without_iva: snapshot.price_without_iva_cents,
        iva_rate: snapshot.iva_rate_bps as i64,
        // Snapshots are frozen at sale time and carry no live stock figure
        stock: 0,
        category: ExternalCategory {
            category_id: snapshot.category.id.clone(),
            name: snapshot.category.name.clone(),
        },
        supplier: ExternalSupplier {
            supplier_id: snapshot.supplier.id.clone(),
            name: snapshot.supplier.name.clone(),
        },
    }
}

/// Translates a live product into the external product sub-document.
pub fn translate_product(product: &Product) -> ExternalProduct {
    ExternalProduct {
        product_id: product.id.clone(),
        name: product.name.clone(),
        price: product.price_cents,
        has_iva: product.has_iva,
        iva: product.iva_per_unit().cents(),
        price_without_iva: product.price_without_iva().cents(),
        iva_rate: product.iva_rate().bps() as i64,
        stock: product.stock,
        category: ExternalCategory {
            category_id: product.category.id.clone(),
            name: product.category.name.clone(),
        },
        supplier: ExternalSupplier {
            supplier_id: product.supplier.id.clone(),
            name: product.supplier.name.clone(),
        },
    }
}

/// Translates a movement into the external flat record.
///
/// Sale lines zero the recount fields; recounts zero the pricing fields.
pub fn translate_movement(movement: &StockMovement) -> ExternalMovement {
    let mut out = ExternalMovement {
        movement_id: movement.id.clone(),
        date: movement.occurred_at.to_rfc3339(),
        product: translate_snapshot(&movement.product),
        quantity: movement.quantity,
        ..Default::default()
    };

    match &movement.kind {
        MovementKind::Sale(line) => {
            out.price = line.unit_price_cents;
            out.total = line.line_total_cents;
            out.iva = line.iva_total_cents;
            out.total_without_iva = line.line_total_without_iva_cents;
            out.pre_printed = line.printed;
            out.paid = line.paid;
            out.selected = line.selected;
            out.is_production = line.production;
            out.discount = line.discount_cents;
            out.discount_reason = line.discount_reason.clone().unwrap_or_default();
            out.for_who = line.for_who.clone();
            out.channel = line.channel.code();
        }
        MovementKind::CountAdjustment(adj) => {
            out.expected_stock = adj.expected_stock;
            out.difference_in_stock = adj.difference_in_stock;
            out.current_stock_count = adj.current_stock_count;
        }
    }

    out
}

/// Translates a payment.
pub fn translate_payment(payment: &Payment) -> ExternalPayment {
    ExternalPayment {
        payment_id: payment.id.clone(),
        method: payment.method.code(),
        amount: payment.amount_cents,
        reference: payment.reference.clone().unwrap_or_default(),
        date: payment.received_at.to_rfc3339(),
    }
}

/// Translates a transaction into the external POS document.
///
/// Pure and total: this function cannot fail, it only defaults.
pub fn translate_transaction(transaction: &Transaction) -> ExternalTransaction {
    ExternalTransaction {
        transaction_id: transaction.id.clone(),
        business_id: transaction.business_id.clone(),
        client_id: transaction.client_id.clone(),
        client_name: transaction.client_name.clone(),
        phone: transaction.phone.clone(),
        email: transaction.email.clone().unwrap_or_default(),
        address: transaction.address.clone().unwrap_or_default(),
        date: transaction.created_at.to_rfc3339(),
        products: transaction.movements.iter().map(translate_movement).collect(),
        total: transaction.grand_total_cents,
        iva: transaction.iva_amount_cents,
        sub_total: transaction.amount_before_iva_cents,
        total_cost: transaction.total_cost_cents,
        status: transaction.status.code(),
        fulfillment: transaction.fulfillment.code(),
        transaction_type: transaction.transaction_type.code(),
        partial_payment: transaction.partial_payment.code(),
        delivery_type: transaction.delivery.code(),
        payments: transaction.payments.iter().map(translate_payment).collect(),
        instructions: transaction.instructions.clone().unwrap_or_default(),
    }
}

// =============================================================================
// External ──► Internal (testing & resync verification only)
// =============================================================================

fn parse_date(raw: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_default()
}

fn none_if_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Restores an internal movement from the external flat record.
///
/// The external shape is flat, so the variant is recovered from which
/// field group is populated: any recount field set means a recount.
pub fn restore_movement(external: &ExternalMovement) -> SyncResult<StockMovement> {
    let snapshot = ProductSnapshot {
        product_id: external.product.product_id.clone(),
        name: external.product.name.clone(),
        price_cents: external.product.price,
        has_iva: external.product.has_iva,
        iva_per_unit_cents: external.product.iva,
        price_without_iva_cents: external.product.price_without_iva,
        iva_rate_bps: external.product.iva_rate as u32,
        category: tienda_core::Category {
            id: external.product.category.category_id.clone(),
            name: external.product.category.name.clone(),
        },
        supplier: tienda_core::Supplier {
            id: external.product.supplier.supplier_id.clone(),
            name: external.product.supplier.name.clone(),
        },
    };

    let is_recount = external.expected_stock != 0
        || external.difference_in_stock != 0
        || external.current_stock_count != 0;

    let kind = if is_recount {
        MovementKind::CountAdjustment(CountAdjustment {
            expected_stock: external.expected_stock,
            difference_in_stock: external.difference_in_stock,
            current_stock_count: external.current_stock_count,
        })
    } else {
        let channel = SalesChannel::from_code(external.channel).ok_or(SyncError::InvalidCode {
            field: "channel",
            code: external.channel,
        })?;

        MovementKind::Sale(SaleLine {
            // The parent document carries the id; movements restored in
            // isolation leave it empty
            transaction_id: String::new(),
            unit_price_cents: external.price,
            line_total_cents: external.total,
            iva_total_cents: external.iva,
            line_total_without_iva_cents: external.total_without_iva,
            printed: external.pre_printed,
            paid: external.paid,
            selected: external.selected,
            production: external.is_production,
            discount_cents: external.discount,
            discount_reason: none_if_empty(&external.discount_reason),
            for_who: external.for_who.clone(),
            channel,
        })
    };

    Ok(StockMovement {
        id: external.movement_id.clone(),
        occurred_at: parse_date(&external.date),
        product: snapshot,
        quantity: external.quantity,
        kind,
    })
}

/// Restores an internal transaction from the external document.
///
/// Used by tests to prove the mapping is round-trip-safe and by operators
/// to verify a manual resync; production never reads the mirror back.
pub fn restore_transaction(external: &ExternalTransaction) -> SyncResult<Transaction> {
    let status = OrderStatus::from_code(external.status).ok_or(SyncError::InvalidCode {
        field: "status",
        code: external.status,
    })?;
    let delivery = DeliveryType::from_code(external.delivery_type).ok_or(SyncError::InvalidCode {
        field: "deliveryType",
        code: external.delivery_type,
    })?;
    let transaction_type =
        TransactionType::from_code(external.transaction_type).ok_or(SyncError::InvalidCode {
            field: "type",
            code: external.transaction_type,
        })?;
    let partial_payment =
        PartialPaymentType::from_code(external.partial_payment).ok_or(SyncError::InvalidCode {
            field: "partialPayment",
            code: external.partial_payment,
        })?;

    let mut movements = Vec::with_capacity(external.products.len());
    for raw in &external.products {
        let mut movement = restore_movement(raw)?;
        if let MovementKind::Sale(line) = &mut movement.kind {
            line.transaction_id = external.transaction_id.clone();
        }
        movements.push(movement);
    }

    let mut payments = Vec::with_capacity(external.payments.len());
    for raw in &external.payments {
        let method = PaymentMethod::from_code(raw.method).ok_or(SyncError::InvalidCode {
            field: "method",
            code: raw.method,
        })?;
        payments.push(Payment {
            id: raw.payment_id.clone(),
            method,
            amount_cents: raw.amount,
            reference: none_if_empty(&raw.reference),
            received_at: parse_date(&raw.date),
        });
    }

    let created_at = parse_date(&external.date);

    Ok(Transaction {
        id: external.transaction_id.clone(),
        business_id: external.business_id.clone(),
        client_id: external.client_id.clone(),
        client_name: external.client_name.clone(),
        phone: external.phone.clone(),
        email: none_if_empty(&external.email),
        address: none_if_empty(&external.address),
        movements,
        grand_total_cents: external.total,
        iva_amount_cents: external.iva,
        amount_before_iva_cents: external.sub_total,
        total_cost_cents: external.total_cost,
        status,
        fulfillment: status.fulfillment(),
        delivery,
        transaction_type,
        partial_payment,
        payments,
        instructions: none_if_empty(&external.instructions),
        created_at,
        updated_at: created_at,
    })
}

/// Convenience used by checkout and tests: translated customer shape is not
/// mirrored separately, so expose the internal one for symmetry checks.
pub fn customer_of(transaction: &Transaction) -> CustomerInfo {
    CustomerInfo {
        client_id: transaction.client_id.clone(),
        name: transaction.client_name.clone(),
        phone: transaction.phone.clone(),
        email: transaction.email.clone(),
        address: transaction.address.clone(),
        delivery: transaction.delivery,
        gift_recipient: None,
        instructions: transaction.instructions.clone(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tienda_core::{build_transaction, CartLine, Category, Supplier};

    fn product(id: &str, price: i64, has_iva: bool, iva: i64, without: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents: price,
            has_iva,
            iva_per_unit_cents: iva,
            price_without_iva_cents: without,
            iva_rate_bps: if has_iva { 1600 } else { 0 },
            stock: 10,
            category: Category {
                id: "cat-1".to_string(),
                name: "Abarrotes".to_string(),
            },
            supplier: Supplier {
                id: "sup-1".to_string(),
                name: "Granos del Sur".to_string(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_transaction() -> Transaction {
        let products = vec![
            product("p1", 100, true, 15, 85),
            product("p2", 50, false, 0, 0),
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
        ];
        let customer = CustomerInfo {
            client_id: "client-1".to_string(),
            name: "Ana".to_string(),
            phone: "555-0101".to_string(),
            email: Some("ana@example.com".to_string()),
            address: Some("Av. Juárez 10".to_string()),
            delivery: DeliveryType::HomeDelivery,
            gift_recipient: None,
            instructions: Some("Tocar el timbre".to_string()),
        };
        build_transaction("biz-1", &lines, &products, &customer).unwrap()
    }

    /// Every field the external system expects must be present in the
    /// serialized output, even when the internal value is absent.
    #[test]
    fn test_totality_all_external_keys_present() {
        let mut txn = sample_transaction();
        // Strip every optional internal field
        txn.email = None;
        txn.address = None;
        txn.instructions = None;

        let external = translate_transaction(&txn);
        let value = serde_json::to_value(&external).unwrap();
        let doc = value.as_object().unwrap();

        for key in [
            "transactionID",
            "businessID",
            "clientID",
            "clientName",
            "phone",
            "email",
            "address",
            "date",
            "products",
            "total",
            "iva",
            "subTotal",
            "totalCost",
            "status",
            "fulfillment",
            "type",
            "partialPayment",
            "deliveryType",
            "payments",
            "instructions",
        ] {
            assert!(doc.contains_key(key), "missing external key: {}", key);
        }

        // Absent internals default, never omit
        assert_eq!(doc["email"], "");
        assert_eq!(doc["address"], "");
        assert_eq!(doc["instructions"], "");

        let movement = value["products"][0].as_object().unwrap();
        for key in [
            "movementID",
            "date",
            "product",
            "quantity",
            "price",
            "total",
            "iva",
            "totalWithoutIVA",
            "prePrinted",
            "paid",
            "selected",
            "isProduction",
            "discount",
            "discountReason",
            "forWho",
            "channel",
            "expectedStock",
            "differenceInStock",
            "currentStockCount",
        ] {
            assert!(movement.contains_key(key), "missing movement key: {}", key);
        }

        let ext_product = movement["product"].as_object().unwrap();
        for key in [
            "productID",
            "name",
            "price",
            "hasIVA",
            "iva",
            "priceWithoutIVA",
            "ivaRate",
            "stock",
            "category",
            "supplier",
        ] {
            assert!(ext_product.contains_key(key), "missing product key: {}", key);
        }
        assert!(ext_product["category"].as_object().unwrap().contains_key("categoryID"));
        assert!(ext_product["supplier"].as_object().unwrap().contains_key("supplierID"));
    }

    #[test]
    fn test_enums_cross_as_integer_codes() {
        let mut txn = sample_transaction();
        txn.advance_status(OrderStatus::Ready).unwrap();

        let external = translate_transaction(&txn);
        let value = serde_json::to_value(&external).unwrap();

        assert_eq!(value["status"], 2);
        assert_eq!(value["deliveryType"], 1);
        assert_eq!(value["type"], 0);
        assert_eq!(value["partialPayment"], 0);
        assert_eq!(value["products"][0]["channel"], 0);
    }

    #[test]
    fn test_field_renames() {
        let txn = sample_transaction();
        let value = serde_json::to_value(translate_transaction(&txn)).unwrap();

        assert_eq!(value["clientID"], "client-1");
        assert_eq!(value["clientName"], "Ana");
        // Internal `printed` crosses as `prePrinted`
        assert_eq!(value["products"][0]["prePrinted"], false);
        assert!(value.get("client_id").is_none());
    }

    #[test]
    fn test_round_trip_preserves_transaction() {
        let txn = sample_transaction();
        let external = translate_transaction(&txn);
        let restored = restore_transaction(&external).unwrap();

        assert_eq!(restored.id, txn.id);
        assert_eq!(restored.client_id, txn.client_id);
        assert_eq!(restored.grand_total_cents, txn.grand_total_cents);
        assert_eq!(restored.iva_amount_cents, txn.iva_amount_cents);
        assert_eq!(restored.amount_before_iva_cents, txn.amount_before_iva_cents);
        assert_eq!(restored.status, txn.status);
        assert_eq!(restored.delivery, txn.delivery);
        assert_eq!(restored.movements.len(), txn.movements.len());

        let original = txn.movements[0].as_sale().unwrap();
        let restored_line = restored.movements[0].as_sale().unwrap();
        assert_eq!(restored_line.transaction_id, txn.id);
        assert_eq!(restored_line.line_total_cents, original.line_total_cents);
        assert_eq!(restored_line.iva_total_cents, original.iva_total_cents);
        assert_eq!(restored.movements[0].product, txn.movements[0].product);
    }

    #[test]
    fn test_recount_movement_flattens_and_restores() {
        let p = product("p1", 100, true, 15, 85);
        let movement = StockMovement::count_adjustment(&p, 8, 10, -2);

        let external = translate_movement(&movement);
        assert_eq!(external.expected_stock, 10);
        assert_eq!(external.difference_in_stock, -2);
        assert_eq!(external.current_stock_count, 8);
        // Pricing side is neutral
        assert_eq!(external.price, 0);
        assert_eq!(external.total, 0);

        let restored = restore_movement(&external).unwrap();
        assert_eq!(restored.as_count_adjustment(), movement.as_count_adjustment());
    }

    #[test]
    fn test_restore_rejects_unknown_codes() {
        let mut external = translate_transaction(&sample_transaction());
        external.status = 99;

        let err = restore_transaction(&external).unwrap_err();
        assert!(matches!(err, SyncError::InvalidCode { field: "status", .. }));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let txn = sample_transaction();
        let a = serde_json::to_string(&translate_transaction(&txn)).unwrap();
        let b = serde_json::to_string(&translate_transaction(&txn)).unwrap();
        assert_eq!(a, b);
    }
}
