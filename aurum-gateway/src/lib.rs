//! Aurum Payment Gateway Connectors
//!
//! Adapter for the Stripe-compatible payments API (REST + webhooks).
//! Normalizes provider-specific errors into the closed gateway error
//! union defined by the payments port.

#![warn(clippy::all)]

// Public modules
pub mod stripe;
pub mod webhook;

// Re-exports
pub use stripe::StripeClient;
pub use webhook::{parse_event, sign_payload, verify_signature, WebhookError};
