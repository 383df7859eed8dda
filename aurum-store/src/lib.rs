//! Aurum Storage Layer
//!
//! Provides persistence for products, carts, orders, and payments.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **Atomic checkout**: `Store::checkout` commits an order, its items,
//!   the cart clear, and the per-line stock decrements as one unit
//! - **In-memory store**: Fast implementation for testing
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//! - **Product cache**: Read-through decorator over the product port
//!
//! # Stock discipline
//!
//! `Product.stock_quantity` is shared across service instances, so no
//! in-process lock can protect it. Every mutation goes through
//! `ProductRepository::adjust_stock`, a single conditional update that
//! refuses to drive the quantity negative and reports the refusal instead
//! of silently doing nothing.

#![warn(clippy::all)]

// Modules
mod cache;
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use cache::CachedProducts;
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{
    CartRepository, CheckoutPlan, OrderRepository, PaymentRepository, ProductRepository, Store,
};
