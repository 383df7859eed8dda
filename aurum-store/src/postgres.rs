//! PostgreSQL store implementation.
//!
//! Production backend over a shared `PgPool`. Correctness of the stock
//! ledger comes from conditional single-statement updates verified via
//! affected rows, not from any in-process locking: multiple service
//! instances share this database.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::{
    CartRepository, CheckoutPlan, OrderRepository, PaymentRepository, ProductRepository, Store,
};
use async_trait::async_trait;
use aurum_domain::{
    Cart, CartId, CartItem, Order, OrderId, OrderItem, OrderStatus, Payment, PaymentId,
    PaymentStatus, Price, Product, ProductId, Quantity, ShippingInfo, UserId,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// PostgreSQL-backed store.
pub struct PgStore {
    /// PostgreSQL connection pool
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Create a new PostgreSQL store.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Row parsing
// =============================================================================

fn parse_product_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let price: Decimal = row.try_get("price").map_err(db_read_err)?;

    Ok(Product {
        id: row.try_get("id").map_err(db_read_err)?,
        name: row.try_get("name").map_err(db_read_err)?,
        description: row.try_get("description").map_err(db_read_err)?,
        price: Price::new(price)
            .map_err(|e| StoreError::Deserialization(format!("Invalid price {}: {}", price, e)))?,
        stock_quantity: row.try_get("stock_quantity").map_err(db_read_err)?,
        category: row.try_get("category").map_err(db_read_err)?,
        deleted_at: row.try_get("deleted_at").map_err(db_read_err)?,
        created_at: row.try_get("created_at").map_err(db_read_err)?,
        updated_at: row.try_get("updated_at").map_err(db_read_err)?,
    })
}

fn parse_cart_row(row: &sqlx::postgres::PgRow) -> Result<Cart, StoreError> {
    Ok(Cart {
        id: row.try_get("id").map_err(db_read_err)?,
        user_id: row.try_get("user_id").map_err(db_read_err)?,
        created_at: row.try_get("created_at").map_err(db_read_err)?,
        updated_at: row.try_get("updated_at").map_err(db_read_err)?,
    })
}

fn parse_cart_item_row(row: &sqlx::postgres::PgRow) -> Result<CartItem, StoreError> {
    let quantity: i32 = row.try_get("quantity").map_err(db_read_err)?;

    Ok(CartItem {
        id: row.try_get("id").map_err(db_read_err)?,
        cart_id: row.try_get("cart_id").map_err(db_read_err)?,
        product_id: row.try_get("product_id").map_err(db_read_err)?,
        quantity: Quantity::new(quantity).map_err(|e| {
            StoreError::Deserialization(format!("Invalid quantity {}: {}", quantity, e))
        })?,
        created_at: row.try_get("created_at").map_err(db_read_err)?,
        updated_at: row.try_get("updated_at").map_err(db_read_err)?,
    })
}

fn parse_order_row(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status").map_err(db_read_err)?;

    Ok(Order {
        id: row.try_get("id").map_err(db_read_err)?,
        user_id: row.try_get("user_id").map_err(db_read_err)?,
        total_amount: row.try_get("total_amount").map_err(db_read_err)?,
        status: OrderStatus::from_str(&status)
            .map_err(|e| StoreError::Deserialization(format!("Invalid status {}: {}", status, e)))?,
        shipping: ShippingInfo {
            recipient: row.try_get("recipient").map_err(db_read_err)?,
            email: row.try_get("email").map_err(db_read_err)?,
            address: row.try_get("address").map_err(db_read_err)?,
            city: row.try_get("city").map_err(db_read_err)?,
            postal_code: row.try_get("postal_code").map_err(db_read_err)?,
            country: row.try_get("country").map_err(db_read_err)?,
        },
        created_at: row.try_get("created_at").map_err(db_read_err)?,
        updated_at: row.try_get("updated_at").map_err(db_read_err)?,
    })
}

fn parse_order_item_row(row: &sqlx::postgres::PgRow) -> Result<OrderItem, StoreError> {
    let quantity: i32 = row.try_get("quantity").map_err(db_read_err)?;
    let unit_price: Decimal = row.try_get("unit_price").map_err(db_read_err)?;

    Ok(OrderItem {
        id: row.try_get("id").map_err(db_read_err)?,
        order_id: row.try_get("order_id").map_err(db_read_err)?,
        product_id: row.try_get("product_id").map_err(db_read_err)?,
        product_name: row.try_get("product_name").map_err(db_read_err)?,
        quantity: Quantity::new(quantity).map_err(|e| {
            StoreError::Deserialization(format!("Invalid quantity {}: {}", quantity, e))
        })?,
        unit_price: Price::new(unit_price).map_err(|e| {
            StoreError::Deserialization(format!("Invalid unit price {}: {}", unit_price, e))
        })?,
        created_at: row.try_get("created_at").map_err(db_read_err)?,
    })
}

fn parse_payment_row(row: &sqlx::postgres::PgRow) -> Result<Payment, StoreError> {
    let status: String = row.try_get("status").map_err(db_read_err)?;

    Ok(Payment {
        id: row.try_get("id").map_err(db_read_err)?,
        user_id: row.try_get("user_id").map_err(db_read_err)?,
        order_id: row.try_get("order_id").map_err(db_read_err)?,
        provider_payment_id: row.try_get("provider_payment_id").map_err(db_read_err)?,
        amount: row.try_get("amount").map_err(db_read_err)?,
        status: PaymentStatus::from_str(&status)
            .map_err(|e| StoreError::Deserialization(format!("Invalid status {}: {}", status, e)))?,
        failure_reason: row.try_get("failure_reason").map_err(db_read_err)?,
        created_at: row.try_get("created_at").map_err(db_read_err)?,
        updated_at: row.try_get("updated_at").map_err(db_read_err)?,
    })
}

fn db_read_err(e: sqlx::Error) -> StoreError {
    StoreError::Deserialization(e.to_string())
}

// =============================================================================
// Product Repository Implementation
// =============================================================================

#[async_trait]
impl ProductRepository for PgStore {
    async fn save(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, stock_quantity, category,
                deleted_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                stock_quantity = EXCLUDED.stock_quantity,
                category = EXCLUDED.category,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = NOW()
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.as_decimal())
        .bind(product.stock_quantity)
        .bind(&product.category)
        .bind(product.deleted_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, stock_quantity, category,
                   deleted_at, created_at, updated_at
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(parse_product_row).transpose()
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, stock_quantity, category,
                   deleted_at, created_at, updated_at
            FROM products
            WHERE id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(parse_product_row).collect()
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, StoreError> {
        // Single conditional statement: the WHERE clause is the guard and
        // the row count is the verdict.
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND stock_quantity + $2 >= 0
            RETURNING stock_quantity
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool.as_ref())
        .await?;

        if let Some(row) = row {
            return Ok(row.try_get("stock_quantity").map_err(db_read_err)?);
        }

        // Refused: report whether the product is missing or short on stock.
        let available: Option<i32> = sqlx::query_scalar(
            "SELECT stock_quantity FROM products WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock { product_id: id, available }),
            None => Err(StoreError::not_found("product", id.to_string())),
        }
    }
}

// =============================================================================
// Cart Repository Implementation
// =============================================================================

#[async_trait]
impl CartRepository for PgStore {
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on
        // conflict, so creation and lookup are one round trip.
        let row = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        parse_cart_row(&row)
    }

    async fn find_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(parse_cart_item_row).collect()
    }

    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, cart_id, product_id, quantity, created_at, updated_at
            FROM cart_items
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(parse_cart_item_row).transpose()
    }

    async fn merge_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET
                quantity = cart_items.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .fetch_one(self.pool.as_ref())
        .await?;

        let merged: i32 = row.try_get("quantity").map_err(db_read_err)?;
        Ok(Quantity::new(merged)?)
    }

    async fn set_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3, updated_at = NOW()
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart_item", product_id.to_string()));
        }
        Ok(())
    }

    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), StoreError> {
        let result =
            sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .execute(self.pool.as_ref())
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart_item", product_id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, recipient, email,
                   address, city, postal_code, country, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(parse_order_row).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, recipient, email,
                   address, city, postal_code, country, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(parse_order_row).collect()
    }

    async fn find_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, unit_price, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(parse_order_item_row).collect()
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Payment Repository Implementation
// =============================================================================

#[async_trait]
impl PaymentRepository for PgStore {
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, order_id, provider_payment_id, amount, status,
                failure_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.order_id)
        .bind(&payment.provider_payment_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_by_order(&self, order_id: OrderId) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, order_id, provider_payment_id, amount, status,
                   failure_reason, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(parse_payment_row).collect()
    }

    async fn find_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, order_id, provider_payment_id, amount, status,
                   failure_reason, created_at, updated_at
            FROM payments
            WHERE provider_payment_id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(parse_payment_row).transpose()
    }

    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, failure_reason = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(failure_reason)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("payment", id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for PgStore {
    fn products(&self) -> &dyn ProductRepository {
        self
    }

    fn carts(&self) -> &dyn CartRepository {
        self
    }

    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self
    }

    /// Commit a checkout inside one database transaction.
    ///
    /// The transaction handle is a scoped resource: `commit` runs only on
    /// the success path, and every other exit (error return, panic unwind)
    /// drops the handle, which rolls the transaction back.
    async fn checkout(&self, plan: &CheckoutPlan) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1. Order row
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_amount, status, recipient, email,
                address, city, postal_code, country, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(plan.order.id)
        .bind(plan.order.user_id)
        .bind(plan.order.total_amount)
        .bind(plan.order.status.as_str())
        .bind(&plan.order.shipping.recipient)
        .bind(&plan.order.shipping.email)
        .bind(&plan.order.shipping.address)
        .bind(&plan.order.shipping.city)
        .bind(&plan.order.shipping.postal_code)
        .bind(&plan.order.shipping.country)
        .bind(plan.order.created_at)
        .bind(plan.order.updated_at)
        .execute(&mut *tx)
        .await?;

        // 2. Line items, bulk inserted in one statement
        if !plan.items.is_empty() {
            let ids: Vec<Uuid> = plan.items.iter().map(|i| i.id).collect();
            let order_ids: Vec<Uuid> = plan.items.iter().map(|i| i.order_id).collect();
            let product_ids: Vec<Uuid> = plan.items.iter().map(|i| i.product_id).collect();
            let names: Vec<String> = plan.items.iter().map(|i| i.product_name.clone()).collect();
            let quantities: Vec<i32> = plan.items.iter().map(|i| i.quantity.as_i32()).collect();
            let prices: Vec<Decimal> =
                plan.items.iter().map(|i| i.unit_price.as_decimal()).collect();

            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, product_name, quantity, unit_price)
                SELECT * FROM UNNEST(
                    $1::uuid[], $2::uuid[], $3::uuid[], $4::text[], $5::int4[], $6::numeric[]
                )
                "#,
            )
            .bind(ids)
            .bind(order_ids)
            .bind(product_ids)
            .bind(names)
            .bind(quantities)
            .bind(prices)
            .execute(&mut *tx)
            .await?;
        }

        // 3. Conditional stock decrement per line. A zero row count means a
        //    concurrent checkout won the remaining stock; abort everything.
        for (product_id, quantity) in plan.stock_decrements() {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity - $2, updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL AND stock_quantity >= $2
                "#,
            )
            .bind(product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: i32 = sqlx::query_scalar(
                    "SELECT stock_quantity FROM products WHERE id = $1 AND deleted_at IS NULL",
                )
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0);

                return Err(StoreError::InsufficientStock { product_id, available });
            }
        }

        // 4. Clear the cart
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(plan.cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
