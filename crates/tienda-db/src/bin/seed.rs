//! # Seed Data Generator
//!
//! Populates the document store with development data: a small catalog,
//! the business settings document and a fresh catalog marker.
//!
//! ## Usage
//! ```bash
//! # Default database path (./tienda.db)
//! cargo run -p tienda-db --bin seed
//!
//! # Specify database path
//! cargo run -p tienda-db --bin seed -- --db ./data/tienda.db
//! ```

use chrono::Utc;
use std::env;
use tienda_core::{Category, Product, StoreSettings, Supplier, DEFAULT_BUSINESS_ID};
use tienda_db::{Database, DbConfig};

/// (name, price_cents, has_iva, iva_per_unit_cents, category, supplier, stock)
const PRODUCTS: &[(&str, i64, bool, i64, &str, &str, i64)] = &[
    ("Café de olla 500g", 14500, true, 2000, "Abarrotes", "Granos del Sur", 40),
    ("Pan dulce surtido", 4500, false, 0, "Panadería", "Horno Local", 25),
    ("Leche entera 1L", 2600, false, 0, "Lácteos", "Lácteos Norte", 60),
    ("Queso fresco 400g", 7800, true, 1076, "Lácteos", "Lácteos Norte", 18),
    ("Agua mineral 600ml", 1500, true, 207, "Bebidas", "Embotelladora MX", 120),
    ("Galletas de avena", 3200, true, 441, "Abarrotes", "Horno Local", 35),
    ("Arroz 1kg", 3900, false, 0, "Abarrotes", "Granos del Sur", 50),
    ("Chocolate de mesa", 5600, true, 772, "Abarrotes", "Granos del Sur", 22),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "./tienda.db".to_string());

    tracing::info!(path = %db_path, "Seeding database");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let now = Utc::now();
    let products = db.products();

    for (i, (name, price, has_iva, iva, category, supplier, stock)) in
        PRODUCTS.iter().enumerate()
    {
        let product = Product {
            id: format!("prod-{:03}", i + 1),
            name: name.to_string(),
            price_cents: *price,
            has_iva: *has_iva,
            iva_per_unit_cents: *iva,
            price_without_iva_cents: price - iva,
            iva_rate_bps: if *has_iva { 1600 } else { 0 },
            stock: *stock,
            category: Category {
                id: slug(category),
                name: category.to_string(),
            },
            supplier: Supplier {
                id: slug(supplier),
                name: supplier.to_string(),
            },
            created_at: now,
            updated_at: now,
        };
        products.upsert(&product).await?;
    }

    db.settings()
        .upsert(&StoreSettings {
            business_id: DEFAULT_BUSINESS_ID.to_string(),
            business_name: "La Tienda".to_string(),
            pos_integration_enabled: true,
            stock_validation_enabled: true,
        })
        .await?;

    db.settings().bump_marker(now).await?;

    tracing::info!(
        products = PRODUCTS.len(),
        "Seed complete: catalog, settings and marker written"
    );

    db.close().await;
    Ok(())
}

/// Parses `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1).cloned())
}

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
