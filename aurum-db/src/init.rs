//! Demo catalog seeding for Aurum.
//!
//! Seeds a small jewelry catalog for development and demo environments.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::Result;

/// One seeded catalog row.
struct SeedProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: &'static str,
    stock_quantity: i32,
    category: &'static str,
}

/// Fixed ids keep the seeding idempotent across runs.
const DEMO_CATALOG: &[SeedProduct] = &[
    SeedProduct {
        id: "018e1b00-0000-7000-8000-000000000001",
        name: "Gold Ring",
        description: "18k gold band with a brushed finish",
        price: "899.99",
        stock_quantity: 25,
        category: "rings",
    },
    SeedProduct {
        id: "018e1b00-0000-7000-8000-000000000002",
        name: "Diamond Earrings",
        description: "0.5ct diamond studs, white gold setting",
        price: "1299.50",
        stock_quantity: 12,
        category: "earrings",
    },
    SeedProduct {
        id: "018e1b00-0000-7000-8000-000000000003",
        name: "Pearl Necklace",
        description: "Freshwater pearl strand, 45cm",
        price: "650.00",
        stock_quantity: 18,
        category: "necklaces",
    },
    SeedProduct {
        id: "018e1b00-0000-7000-8000-000000000004",
        name: "Silver Bracelet",
        description: "Sterling silver chain bracelet",
        price: "249.99",
        stock_quantity: 40,
        category: "bracelets",
    },
    SeedProduct {
        id: "018e1b00-0000-7000-8000-000000000005",
        name: "Sapphire Pendant",
        description: "Ceylon sapphire on a white gold chain",
        price: "1899.00",
        stock_quantity: 6,
        category: "necklaces",
    },
];

/// Seed the demo catalog.
///
/// Uses INSERT ... ON CONFLICT DO NOTHING for idempotency: existing rows
/// (including operator-edited stock levels) are left untouched.
pub async fn init_demo_catalog(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u32;

    for product in DEMO_CATALOG {
        let id = Uuid::from_str(product.id)?;
        let price = Decimal::from_str(product.price)?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock_quantity, category)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(product.name)
        .bind(product.description)
        .bind(price)
        .bind(product.stock_quantity)
        .bind(product.category)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected() as u32;
    }

    tx.commit().await?;

    info!(inserted, total = DEMO_CATALOG.len(), "Demo catalog seeded");
    Ok(())
}
