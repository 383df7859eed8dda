//! Aurum Payments
//!
//! Orchestrates payment-intent creation against an external gateway.
//!
//! # Flow
//!
//! ```text
//! RetryOrderPayment ──► retry governor (order-level budget)
//!                            │
//!                            ▼
//! CreatePaymentIntent ──► bounded retry loop ──► PaymentGatewayPort
//!                          (same idempotency key on every attempt)
//! ```
//!
//! Two retry layers with different jobs: the orchestrator retries one
//! logical call across transient gateway failures (bounded, jittered
//! backoff, idempotency-key reuse so a network retry cannot double
//! charge); the governor caps how many logical attempts an order may
//! accumulate before a human has to look at it.

#![warn(clippy::all)]

pub mod error;
pub mod ports;
pub mod service;
pub mod stub;

// Re-exports
pub use error::PaymentError;
pub use ports::{
    CreateIntentRequest, GatewayError, GatewayErrorKind, GatewayEvent, GatewayEventKind,
    PaymentGatewayPort, PaymentIntent,
};
pub use service::{PaymentService, MAX_ATTEMPTS_PER_ORDER, MAX_INTENT_ATTEMPTS};
pub use stub::StubGateway;
