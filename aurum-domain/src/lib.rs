//! Aurum Domain Layer
//!
//! Core business entities and value objects for the jewelry store backend:
//! products, carts, orders with price-snapshotted line items, and payment
//! attempts. Status transitions for orders and payments live here so that
//! no other layer can invent its own rules for them.

#![warn(clippy::all)]

pub mod entities;
pub mod status;
pub mod value_objects;

// Re-exports
pub use entities::{
    Cart, CartId, CartItem, CartItemId, Order, OrderId, OrderItem, OrderItemId, Payment,
    PaymentId, Product, ProductId, UserId,
};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{DomainError, Price, Quantity, ShippingInfo};
