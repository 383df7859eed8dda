//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access.
//!
//! Atomicity of `checkout` comes from taking every affected table's write
//! lock for the duration of the commit, always in the same order
//! (products, cart items, orders, order items), after validating all
//! stock decrements up front.

use crate::error::StoreError;
use crate::repository::{
    CartRepository, CheckoutPlan, OrderRepository, PaymentRepository, ProductRepository, Store,
};
use async_trait::async_trait;
use aurum_domain::{
    Cart, CartId, CartItem, Order, OrderId, OrderItem, OrderStatus, Payment, PaymentId,
    PaymentStatus, Product, ProductId, Quantity, UserId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store for testing
pub struct MemoryStore {
    products: RwLock<HashMap<ProductId, Product>>,
    carts: RwLock<HashMap<CartId, Cart>>,
    cart_items: RwLock<HashMap<(CartId, ProductId), CartItem>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    order_items: RwLock<Vec<OrderItem>>,
    payments: RwLock<Vec<Payment>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            products: RwLock::new(HashMap::new()),
            carts: RwLock::new(HashMap::new()),
            cart_items: RwLock::new(HashMap::new()),
            orders: RwLock::new(HashMap::new()),
            order_items: RwLock::new(Vec::new()),
            payments: RwLock::new(Vec::new()),
        }
    }

    /// Get the number of orders
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Get the number of order items across all orders
    pub fn order_item_count(&self) -> usize {
        self.order_items.read().unwrap().len()
    }

    /// Get the number of items in a cart
    pub fn cart_item_count(&self, cart_id: CartId) -> usize {
        self.cart_items.read().unwrap().keys().filter(|(cid, _)| *cid == cart_id).count()
    }

    /// Get the number of payment attempts
    pub fn payment_count(&self) -> usize {
        self.payments.read().unwrap().len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.products.write().unwrap().clear();
        self.carts.write().unwrap().clear();
        self.cart_items.write().unwrap().clear();
        self.orders.write().unwrap().clear();
        self.order_items.write().unwrap().clear();
        self.payments.write().unwrap().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Product Repository Implementation
// =============================================================================

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn save(&self, product: &Product) -> Result<(), StoreError> {
        let mut products = self.products.write().unwrap();
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().unwrap();
        Ok(products.get(&id).filter(|p| p.is_available()).cloned())
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id))
            .filter(|p| p.is_available())
            .cloned()
            .collect())
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, StoreError> {
        let mut products = self.products.write().unwrap();

        let product = products
            .get_mut(&id)
            .filter(|p| p.is_available())
            .ok_or_else(|| StoreError::not_found("product", id.to_string()))?;

        let new_quantity = product.stock_quantity + delta;
        if new_quantity < 0 {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                available: product.stock_quantity,
            });
        }

        product.stock_quantity = new_quantity;
        product.updated_at = Utc::now();
        Ok(new_quantity)
    }
}

// =============================================================================
// Cart Repository Implementation
// =============================================================================

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let mut carts = self.carts.write().unwrap();

        if let Some(cart) = carts.values().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let cart = Cart::new(user_id);
        carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        let cart_items = self.cart_items.read().unwrap();
        let mut items: Vec<CartItem> = cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError> {
        let cart_items = self.cart_items.read().unwrap();
        Ok(cart_items.get(&(cart_id, product_id)).cloned())
    }

    async fn merge_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, StoreError> {
        let mut cart_items = self.cart_items.write().unwrap();

        match cart_items.get_mut(&(cart_id, product_id)) {
            Some(item) => {
                let merged = Quantity::new(item.quantity.as_i32() + quantity.as_i32())?;
                item.quantity = merged;
                item.updated_at = Utc::now();
                Ok(merged)
            },
            None => {
                let item = CartItem::new(cart_id, product_id, quantity);
                cart_items.insert((cart_id, product_id), item);
                Ok(quantity)
            },
        }
    }

    async fn set_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), StoreError> {
        let mut cart_items = self.cart_items.write().unwrap();

        let item = cart_items
            .get_mut(&(cart_id, product_id))
            .ok_or_else(|| StoreError::not_found("cart_item", product_id.to_string()))?;

        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), StoreError> {
        let mut cart_items = self.cart_items.write().unwrap();

        cart_items
            .remove(&(cart_id, product_id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("cart_item", product_id.to_string()))
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> =
            orders.values().filter(|o| o.user_id == user_id).cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn find_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let order_items = self.order_items.read().unwrap();
        Ok(order_items.iter().filter(|item| item.order_id == order_id).cloned().collect())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        let mut orders = self.orders.write().unwrap();

        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id.to_string()))?;

        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Payment Repository Implementation
// =============================================================================

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut payments = self.payments.write().unwrap();
        payments.push(payment.clone());
        Ok(())
    }

    async fn count_by_order(&self, order_id: OrderId) -> Result<i64, StoreError> {
        let payments = self.payments.read().unwrap();
        Ok(payments.iter().filter(|p| p.order_id == order_id).count() as i64)
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError> {
        let payments = self.payments.read().unwrap();
        let mut result: Vec<Payment> =
            payments.iter().filter(|p| p.order_id == order_id).cloned().collect();
        result.sort_by_key(|p| p.created_at);
        Ok(result)
    }

    async fn find_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().unwrap();
        Ok(payments
            .iter()
            .find(|p| p.provider_payment_id.as_deref() == Some(provider_id))
            .cloned())
    }

    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut payments = self.payments.write().unwrap();

        let payment = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("payment", id.to_string()))?;

        payment.status = status;
        payment.failure_reason = failure_reason.map(|s| s.to_string());
        payment.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for MemoryStore {
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

    async fn checkout(&self, plan: &CheckoutPlan) -> Result<(), StoreError> {
        // Lock order: products, cart items, orders, order items.
        let mut products = self.products.write().unwrap();
        let mut cart_items = self.cart_items.write().unwrap();
        let mut orders = self.orders.write().unwrap();
        let mut order_items = self.order_items.write().unwrap();

        // Validate every decrement before applying any write.
        for (product_id, quantity) in plan.stock_decrements() {
            let product = products
                .get(&product_id)
                .filter(|p| p.is_available())
                .ok_or_else(|| StoreError::not_found("product", product_id.to_string()))?;

            if product.stock_quantity < quantity {
                return Err(StoreError::InsufficientStock {
                    product_id,
                    available: product.stock_quantity,
                });
            }
        }

        let now = Utc::now();

        for (product_id, quantity) in plan.stock_decrements() {
            // Validated above; the locks have not been released in between.
            if let Some(product) = products.get_mut(&product_id) {
                product.stock_quantity -= quantity;
                product.updated_at = now;
            }
        }

        orders.insert(plan.order.id, plan.order.clone());
        order_items.extend(plan.items.iter().cloned());
        cart_items.retain(|(cart_id, _), _| *cart_id != plan.cart_id);

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
