//! Aurum Order Fulfillment
//!
//! Converts carts into durable orders and governs order status
//! transitions.
//!
//! # Flow
//!
//! ```text
//! CartService ──► cart_items ──► assembler ──► CheckoutPlan ──► Store::checkout
//!                                                                 (atomic)
//! ```
//!
//! The assembler is pure: it validates stock sufficiency against the
//! snapshot it was given and freezes prices, but performs no I/O. The
//! authoritative stock check is the conditional decrement inside the
//! checkout transaction: two concurrent checkouts can both pass assembly,
//! and the store decides the winner.

#![warn(clippy::all)]

pub mod assembler;
pub mod cart;
pub mod error;
pub mod service;
pub mod summary;

// Re-exports
pub use cart::CartService;
pub use error::OrderError;
pub use service::OrderService;
pub use summary::{CartLine, CartView, OrderLine, OrderSummary};
