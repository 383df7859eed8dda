//! Seeding helpers for database-backed tests.

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Options for seeding a product.
pub struct SeedProductOptions {
    /// Product name (defaults to "Gold Ring")
    pub name: String,
    /// Price as a decimal string (defaults to "899.99")
    pub price: String,
    /// Units in stock (defaults to 10)
    pub stock_quantity: i32,
    /// Category (defaults to "rings")
    pub category: String,
}

impl Default for SeedProductOptions {
    fn default() -> Self {
        Self {
            name: "Gold Ring".to_string(),
            price: "899.99".to_string(),
            stock_quantity: 10,
            category: "rings".to_string(),
        }
    }
}

/// Seed a product and return its id.
pub async fn seed_product(pool: &PgPool, options: SeedProductOptions) -> Result<Uuid> {
    let id = Uuid::now_v7();
    let price = Decimal::from_str(&options.price)?;

    sqlx::query(
        r#"
        INSERT INTO products (id, name, description, price, stock_quantity, category)
        VALUES ($1, $2, '', $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(&options.name)
    .bind(price)
    .bind(options.stock_quantity)
    .bind(&options.category)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Seed a cart with line items for a user and return the cart id.
pub async fn seed_cart_with_items(
    pool: &PgPool,
    user_id: Uuid,
    lines: &[(Uuid, i32)],
) -> Result<Uuid> {
    let mut tx = pool.begin().await?;

    let cart_id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO carts (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(cart_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    // The insert may have been a no-op; read the real cart id back.
    let cart_id: Uuid = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    for (product_id, quantity) in lines {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(cart_id)
}

/// Seed an order in a given status and return its id.
pub async fn seed_order(
    pool: &PgPool,
    user_id: Uuid,
    total_amount: &str,
    status: &str,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    let total = Decimal::from_str(total_amount)?;

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, total_amount, status,
            recipient, email, address, city, postal_code, country
        ) VALUES (
            $1, $2, $3, $4,
            'Test Buyer', 'buyer@example.com', '1 Test Street', 'Testville', '00000', 'Testland'
        )
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(total)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Seed a payment attempt for an order and return its id.
pub async fn seed_payment(
    pool: &PgPool,
    user_id: Uuid,
    order_id: Uuid,
    amount: &str,
    status: &str,
    provider_payment_id: Option<&str>,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    let amount = Decimal::from_str(amount)?;

    sqlx::query(
        r#"
        INSERT INTO payments (id, user_id, order_id, provider_payment_id, amount, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(order_id)
    .bind(provider_payment_id)
    .bind(amount)
    .bind(status)
    .execute(pool)
    .await?;

    Ok(id)
}
