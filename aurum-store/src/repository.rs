//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the domain.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use aurum_domain::{
    Cart, CartId, CartItem, Order, OrderId, OrderItem, OrderStatus, Payment, PaymentId,
    PaymentStatus, Product, ProductId, Quantity, UserId,
};

// =============================================================================
// Checkout plan
// =============================================================================

/// The complete set of writes one checkout commits atomically.
///
/// Built by the order assembler and handed to `Store::checkout`, which
/// guarantees that the order insert, the line-item inserts, the cart clear,
/// and the per-line conditional stock decrements are all visible or none
/// are.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    /// The order row to insert
    pub order: Order,
    /// Its line items (one per distinct product)
    pub items: Vec<OrderItem>,
    /// The cart whose items are cleared by this checkout
    pub cart_id: CartId,
}

impl CheckoutPlan {
    /// The stock decrement each line requires, as (product, units).
    ///
    /// Cart lines are unique per product, so no aggregation is needed.
    pub fn stock_decrements(&self) -> impl Iterator<Item = (ProductId, i32)> + '_ {
        self.items.iter().map(|item| (item.product_id, item.quantity.as_i32()))
    }
}

// =============================================================================
// Product repository
// =============================================================================

/// Repository for Product entities and the stock ledger primitive.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Save a product (insert or update). Invalidates any cached copy.
    async fn save(&self, product: &Product) -> Result<(), StoreError>;

    /// Find an available (not soft-deleted) product by ID.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Batch-fetch available products by ID in a single round trip.
    ///
    /// Missing or soft-deleted products are simply absent from the result;
    /// callers decide whether that is an error.
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// Conditionally adjust stock: applies `stock_quantity += delta` only
    /// if the result stays >= 0, returning the new quantity.
    ///
    /// This is the only legal way to mutate stock. The check and the write
    /// are one operation against the backing store, so concurrent callers
    /// serialize there and the first successful committer wins.
    ///
    /// # Errors
    ///
    /// `StoreError::InsufficientStock` if the adjustment would drive the
    /// quantity negative; `StoreError::NotFound` for unknown products.
    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, StoreError>;
}

// =============================================================================
// Cart repository
// =============================================================================

/// Repository for carts and their line items.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Find the user's cart, lazily creating an empty one on first access.
    async fn find_or_create_by_user(&self, user_id: UserId) -> Result<Cart, StoreError>;

    /// All line items of a cart.
    async fn find_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError>;

    /// A single line item, if the product is in the cart.
    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, StoreError>;

    /// Add units of a product to a cart, merging with an existing line.
    ///
    /// Returns the line quantity after the merge.
    async fn merge_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, StoreError>;

    /// Overwrite a line's quantity.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the product is not in the cart.
    async fn set_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), StoreError>;

    /// Remove a line from a cart.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the product is not in the cart.
    async fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> Result<(), StoreError>;
}

// =============================================================================
// Order repository
// =============================================================================

/// Repository for committed orders.
///
/// Orders are only ever created through `Store::checkout`; this trait
/// covers reads and the status write used by the state machine.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by ID.
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders of a user, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    /// Line items of an order.
    async fn find_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Write a new status (legality is decided by the state machine
    /// before this is called).
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), StoreError>;
}

// =============================================================================
// Payment repository
// =============================================================================

/// Repository for payment attempts.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Record a new attempt.
    async fn insert(&self, payment: &Payment) -> Result<(), StoreError>;

    /// Number of attempts recorded for an order (the retry governor's
    /// budget counter).
    async fn count_by_order(&self, order_id: OrderId) -> Result<i64, StoreError>;

    /// All attempts for an order, oldest first.
    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError>;

    /// Find the attempt holding a gateway intent id.
    async fn find_by_provider_id(&self, provider_id: &str)
        -> Result<Option<Payment>, StoreError>;

    /// Settle an attempt's status.
    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        failure_reason: Option<&str>,
    ) -> Result<(), StoreError>;
}

// =============================================================================
// Store
// =============================================================================

/// Combined store interface.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get product repository
    fn products(&self) -> &dyn ProductRepository;

    /// Get cart repository
    fn carts(&self) -> &dyn CartRepository;

    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;

    /// Get payment repository
    fn payments(&self) -> &dyn PaymentRepository;

    /// Commit a checkout atomically.
    ///
    /// Inserts the order and its items, clears the cart, and applies every
    /// line's conditional stock decrement inside one transactional unit of
    /// work. Any failure, including a losing stock decrement, rolls the
    /// whole unit back and leaves zero partial state.
    ///
    /// # Errors
    ///
    /// `StoreError::InsufficientStock` identifies the losing line when a
    /// concurrent checkout won the remaining stock.
    async fn checkout(&self, plan: &CheckoutPlan) -> Result<(), StoreError>;
}
