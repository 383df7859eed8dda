//! Order service: checkout orchestration and status transitions.
//!
//! # Flow
//!
//! ```text
//! Cart snapshot → batch product fetch → assemble → Store::checkout
//! ```
//!
//! The assembler's stock validation is advisory; the conditional
//! decrements inside `Store::checkout` are authoritative. When a
//! concurrent checkout wins the remaining stock between the two, the
//! store's refusal is translated back into the same `InsufficientStock`
//! detail the assembler would have produced.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use aurum_domain::{OrderId, OrderStatus, Product, ProductId, ShippingInfo, UserId};
use aurum_store::{
    CartRepository, CheckoutPlan, OrderRepository, ProductRepository, Store, StoreError,
};

use crate::assembler::assemble_order;
use crate::error::OrderError;
use crate::summary::OrderSummary;

/// Cart-to-order conversion and order lifecycle operations.
pub struct OrderService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> OrderService<S> {
    /// Create a new order service.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Convert the user's cart into a durable order.
    ///
    /// The order row, its line items, the cart clear, and every line's
    /// stock decrement commit atomically: a failure at any point leaves
    /// zero partial state.
    ///
    /// # Errors
    ///
    /// - `OrderError::CartEmpty` if the cart has no lines
    /// - `OrderError::ProductUnavailable` if a line's product vanished
    /// - `OrderError::InsufficientStock` if any line loses the stock race
    pub async fn create_order_from_cart(
        &self,
        user_id: UserId,
        shipping: ShippingInfo,
    ) -> Result<OrderSummary, OrderError> {
        // 1. Cart snapshot
        let cart = self.store.carts().find_or_create_by_user(user_id).await?;
        let cart_items = self.store.carts().find_items(cart.id).await?;

        if cart_items.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        // 2. One batch fetch for all referenced products
        let product_ids: Vec<ProductId> =
            cart_items.iter().map(|item| item.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .products()
            .find_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        // 3. Pure assembly: validate lines, freeze prices, sum the total
        let assembled = assemble_order(user_id, &cart_items, &products, shipping)?;

        // 4. Atomic commit; the store re-checks stock with conditional
        //    decrements, so a concurrent winner surfaces here
        let plan = CheckoutPlan {
            order: assembled.order,
            items: assembled.items,
            cart_id: cart.id,
        };

        if let Err(e) = self.store.checkout(&plan).await {
            return Err(match e {
                StoreError::InsufficientStock { product_id, available } => {
                    let in_cart = cart_items
                        .iter()
                        .find(|item| item.product_id == product_id)
                        .map(|item| item.quantity.as_i32())
                        .unwrap_or(0);

                    warn!(
                        %user_id,
                        %product_id,
                        requested = in_cart,
                        available,
                        "Checkout lost the stock race"
                    );

                    OrderError::InsufficientStock {
                        product_id,
                        requested: in_cart,
                        available,
                        in_cart,
                    }
                },
                other => other.into(),
            });
        }

        info!(
            %user_id,
            order_id = %plan.order.id,
            total = %plan.order.total_amount,
            lines = plan.items.len(),
            "Order created from cart"
        );

        Ok(OrderSummary::new(&plan.order, &plan.items))
    }

    /// Fetch a single order, enforcing ownership.
    pub async fn get_order_info(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderSummary, OrderError> {
        let order = self
            .store
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !order.is_owned_by(user_id) {
            return Err(OrderError::OrderNotOwned(order_id));
        }

        let items = self.store.orders().find_items(order_id).await?;
        Ok(OrderSummary::new(&order, &items))
    }

    /// The user's order history, newest first.
    pub async fn get_orders_history(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, OrderError> {
        let orders = self.store.orders().find_by_user(user_id).await?;

        let mut summaries = Vec::with_capacity(orders.len());
        for order in &orders {
            let items = self.store.orders().find_items(order.id).await?;
            summaries.push(OrderSummary::new(order, &items));
        }

        Ok(summaries)
    }

    /// Cancel an order on behalf of its owner.
    ///
    /// Legal while the order is `pending` or `paid`; `delivered` and
    /// already-`cancelled` orders are refused. Stock is not restored;
    /// stock only moves during order creation.
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<(), OrderError> {
        let order = self
            .store
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !order.is_owned_by(user_id) {
            return Err(OrderError::OrderNotOwned(order_id));
        }

        if !order.status.can_cancel() {
            return Err(OrderError::CannotCancel(order_id));
        }

        self.store.orders().update_status(order_id, OrderStatus::Cancelled).await?;

        info!(%user_id, %order_id, from = %order.status, "Order cancelled");
        Ok(())
    }

    /// Privileged status update (operator path).
    ///
    /// The incoming string must name a known status; terminal orders
    /// (`delivered`, `cancelled`) are frozen. Within those bounds the new
    /// status is written verbatim.
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        status: &str,
    ) -> Result<(), OrderError> {
        let new_status = OrderStatus::from_str(status)
            .map_err(|_| OrderError::InvalidStatus(status.to_string()))?;

        let order = self
            .store
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !order.status.can_change() {
            return Err(OrderError::CannotChangeStatus(order_id));
        }

        self.store.orders().update_status(order_id, new_status).await?;

        info!(%order_id, from = %order.status, to = %new_status, "Order status updated");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
