//! Daemon error types.

use aurum_orders::OrderError;
use aurum_payments::PaymentError;
use aurum_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Order fulfillment error
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Payment error
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server error (bind, serve)
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
