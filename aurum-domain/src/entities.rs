//! Domain entities for the Aurum store.
//!
//! Core business entities with identity and lifecycle. Orders and their
//! line items are immutable after creation except for the order status;
//! unit prices and product names are snapshotted into line items so that
//! later catalog edits never change what a customer agreed to pay.

use crate::status::{OrderStatus, PaymentStatus};
use crate::value_objects::{Price, Quantity, ShippingInfo};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// IDs
// =============================================================================

/// Unique identifier for a user (issued by the auth layer, opaque here)
pub type UserId = Uuid;

/// Unique identifier for a Product
pub type ProductId = Uuid;

/// Unique identifier for a Cart
pub type CartId = Uuid;

/// Unique identifier for a CartItem
pub type CartItemId = Uuid;

/// Unique identifier for an Order
pub type OrderId = Uuid;

/// Unique identifier for an OrderItem
pub type OrderItemId = Uuid;

/// Unique identifier for a Payment attempt
pub type PaymentId = Uuid;

// =============================================================================
// Product
// =============================================================================

/// A catalog product.
///
/// `stock_quantity` is the contended shared resource of the whole system:
/// it is only ever mutated through the store layer's conditional update,
/// never through a read-then-write pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub stock_quantity: i32,
    pub category: String,

    // Soft delete: a deleted product stays referencable from past orders
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product with a fresh id.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        stock_quantity: i32,
        category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: description.into(),
            price,
            stock_quantity,
            category: category.into(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the product can be shown and sold.
    pub fn is_available(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A user's shopping cart.
///
/// One per user, lazily created on first access, never deleted; it is
/// reused across orders: checkout clears its items, not the cart itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create a new empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, created_at: now, updated_at: now }
    }
}

/// A single product line in a cart.
///
/// Unique per (cart, product); adding an existing product merges quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Create a new cart line.
    pub fn new(cart_id: CartId, product_id: ProductId, quantity: Quantity) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            cart_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A committed order.
///
/// Immutable after creation except for `status` and `updated_at`;
/// `total_amount` equals the sum of line subtotals at creation time and is
/// never recomputed from live product prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order.
    pub fn new(user_id: UserId, total_amount: Decimal, shipping: ShippingInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            total_amount,
            status: OrderStatus::Pending,
            shipping,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the order belongs to the given user.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// A price-snapshotted order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Name snapshot, immune to later catalog edits
    pub product_name: String,
    pub quantity: Quantity,
    /// Price snapshot taken at order-creation time
    pub unit_price: Price,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Create a line for an order, snapshotting the product's current
    /// name and price.
    pub fn from_product(order_id: OrderId, product: &Product, quantity: Quantity) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            created_at: Utc::now(),
        }
    }

    /// Line subtotal: unit price × quantity.
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.as_decimal() * self.quantity.as_decimal()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// One payment attempt against an order.
///
/// Multiple rows may exist per order (one per orchestrated attempt); the
/// row count bounds how many more attempts the retry governor allows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub order_id: OrderId,
    /// Gateway-side intent id, present once an intent was created
    pub provider_payment_id: Option<String>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Record a pending attempt for which the gateway created an intent.
    pub fn pending(
        user_id: UserId,
        order_id: OrderId,
        amount: Decimal,
        provider_payment_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            order_id,
            provider_payment_id: Some(provider_payment_id.into()),
            amount,
            status: PaymentStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a failed attempt that never produced a usable intent.
    pub fn failed(
        user_id: UserId,
        order_id: OrderId,
        amount: Decimal,
        failure_reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            order_id,
            provider_payment_id: None,
            amount,
            status: PaymentStatus::Failed,
            failure_reason: Some(failure_reason.into()),
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn shipping() -> ShippingInfo {
        ShippingInfo::new("Ada Lovelace", "ada@example.com", "12 Gem Street", "London", "E1 6AN", "UK")
            .unwrap()
    }

    #[test]
    fn test_product_availability() {
        let mut product = Product::new(
            "Gold Ring",
            "18k gold band",
            Price::new(dec!(899.99)).unwrap(),
            10,
            "rings",
        );
        assert!(product.is_available());

        product.deleted_at = Some(Utc::now());
        assert!(!product.is_available());
    }

    #[test]
    fn test_order_starts_pending() {
        let order = Order::new(Uuid::now_v7(), dec!(3749.48), shipping());
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_order_ownership() {
        let user_id = Uuid::now_v7();
        let order = Order::new(user_id, dec!(100), shipping());
        assert!(order.is_owned_by(user_id));
        assert!(!order.is_owned_by(Uuid::now_v7()));
    }

    #[test]
    fn test_order_item_snapshots_price_and_name() {
        let mut product = Product::new(
            "Pearl Necklace",
            "Freshwater pearls",
            Price::new(dec!(650.00)).unwrap(),
            5,
            "necklaces",
        );
        let item =
            OrderItem::from_product(Uuid::now_v7(), &product, Quantity::new(2).unwrap());

        // Later catalog edits must not affect the snapshot
        product.price = Price::new(dec!(999.99)).unwrap();
        product.name = "Renamed".to_string();

        assert_eq!(item.unit_price.as_decimal(), dec!(650.00));
        assert_eq!(item.product_name, "Pearl Necklace");
        assert_eq!(item.subtotal(), dec!(1300.00));
    }

    #[test]
    fn test_payment_constructors() {
        let user_id = Uuid::now_v7();
        let order_id = Uuid::now_v7();

        let ok = Payment::pending(user_id, order_id, dec!(100), "pi_123");
        assert_eq!(ok.status, PaymentStatus::Pending);
        assert_eq!(ok.provider_payment_id.as_deref(), Some("pi_123"));
        assert!(ok.failure_reason.is_none());

        let bad = Payment::failed(user_id, order_id, dec!(100), "card declined");
        assert_eq!(bad.status, PaymentStatus::Failed);
        assert!(bad.provider_payment_id.is_none());
        assert_eq!(bad.failure_reason.as_deref(), Some("card declined"));
    }
}
