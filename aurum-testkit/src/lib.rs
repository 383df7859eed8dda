//! Test helpers for Aurum database-backed tests.
//!
//! Provides seeding helpers for products, carts, and orders.

mod helpers;

pub use helpers::{seed_cart_with_items, seed_order, seed_payment, seed_product, SeedProductOptions};

use anyhow::Result;
use sqlx::PgPool;

/// Setup a clean test database by running migrations.
///
/// Convenience function for tests that need a fresh schema.
/// Note: migrations are located at the workspace root.
pub async fn setup_test_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../migrations").run(pool).await?;
    Ok(())
}
