//! Order fulfillment error types.

use aurum_domain::{DomainError, OrderId, ProductId};
use aurum_store::StoreError;
use thiserror::Error;

/// Errors that can occur during cart and order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout attempted on an empty cart
    #[error("Cart is empty")]
    CartEmpty,

    /// A line wants more units than are in stock.
    ///
    /// Carries enough detail for the caller to render a useful message:
    /// which product, how many were requested, how many remain, and how
    /// many the cart already holds.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, \
         {available} available ({in_cart} already in cart)"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
        in_cart: i32,
    },

    /// Product is unknown or no longer sold
    #[error("Product unavailable: {0}")]
    ProductUnavailable(ProductId),

    /// Order does not exist
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order exists but belongs to a different user
    #[error("Order not owned by caller: {0}")]
    OrderNotOwned(OrderId),

    /// Cancellation attempted in a status that forbids it
    #[error("Order cannot be cancelled: {0}")]
    CannotCancel(OrderId),

    /// Privileged status change attempted on a terminal order
    #[error("Order status cannot be changed: {0}")]
    CannotChangeStatus(OrderId),

    /// Status string is not one of the known statuses
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
