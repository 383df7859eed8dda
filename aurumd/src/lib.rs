//! Aurum Daemon Library
//!
//! Runtime wiring for the jewelry store backend core.
//!
//! # Architecture
//!
//! ```text
//! HTTP (axum) → CartService / OrderService / PaymentService → Store
//!                                        │
//!                                        └──► Payment Gateway
//! ```
//!
//! # Components
//!
//! - **Daemon**: owns the wiring and the server lifecycle
//! - **API**: HTTP endpoints binding identifiers/DTOs to the services
//! - **Config**: Environment-based configuration
//! - **db**: `aurumd db migrate|status|init` subcommands

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;

pub use config::{Config, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
