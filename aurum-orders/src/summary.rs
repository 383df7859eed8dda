//! Read-side DTOs returned to callers.

use aurum_domain::{Cart, CartId, CartItem, Order, OrderId, OrderItem, OrderItemId, OrderStatus,
    Product, ProductId, ShippingInfo};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Order summary
// =============================================================================

/// One rendered order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// The caller-facing view of a committed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Build a summary from an order and its line items.
    pub fn new(order: &Order, items: &[OrderItem]) -> Self {
        let lines = items
            .iter()
            .map(|item| OrderLine {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                unit_price: item.unit_price.as_decimal(),
                quantity: item.quantity.as_i32(),
                subtotal: item.subtotal(),
            })
            .collect();

        Self {
            id: order.id,
            items: lines,
            shipping: order.shipping.clone(),
            total_amount: order.total_amount,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

// =============================================================================
// Cart view
// =============================================================================

/// One rendered cart line, priced from the live catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// The caller-facing view of a cart.
///
/// Unlike an order, a cart view is priced live: totals here can change
/// with the catalog until checkout freezes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

impl CartView {
    /// Build a view from cart lines and the products they reference.
    ///
    /// Lines whose product has disappeared from the catalog are omitted.
    pub fn new(cart: &Cart, items: &[CartItem], products: &HashMap<ProductId, Product>) -> Self {
        let lines: Vec<CartLine> = items
            .iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?;
                let subtotal = product.price.as_decimal() * item.quantity.as_decimal();
                Some(CartLine {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    unit_price: product.price.as_decimal(),
                    quantity: item.quantity.as_i32(),
                    subtotal,
                })
            })
            .collect();

        let total = lines.iter().map(|line| line.subtotal).sum();

        Self { cart_id: cart.id, items: lines, total }
    }
}
