//! Payment error types and the gateway-to-domain translation table.

use crate::ports::{GatewayError, GatewayErrorKind};
use aurum_domain::OrderId;
use aurum_store::StoreError;
use thiserror::Error;

/// Errors returned to callers of the payment services.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Card was declined by the issuer
    #[error("Card was declined")]
    CardDeclined,

    /// Card has expired
    #[error("Card has expired")]
    CardExpired,

    /// Card security code did not match
    #[error("Card security code is incorrect")]
    IncorrectCvc,

    /// Anything else, including exhausted transient retries
    #[error("Payment processing failed: {0}")]
    ProcessingFailed(String),

    /// Order-level retry budget exhausted; human intervention required
    #[error("Too many payment retries for order {0}")]
    TooManyRetries(OrderId),

    /// Retry attempted on an order that already settled
    #[error("Order is already paid: {0}")]
    OrderAlreadyPaid(OrderId),

    /// Retry attempted on a cancelled order
    #[error("Order is cancelled: {0}")]
    OrderCancelled(OrderId),

    /// Order does not exist
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order exists but belongs to a different user
    #[error("Order not owned by caller: {0}")]
    OrderNotOwned(OrderId),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Translate a classified gateway failure into the caller-facing
    /// taxonomy.
    ///
    /// This is the single place the translation happens; callers never
    /// see a `GatewayError`.
    pub fn from_gateway(err: &GatewayError) -> Self {
        match (err.kind, err.code.as_deref()) {
            (GatewayErrorKind::Card, Some("card_declined")) => PaymentError::CardDeclined,
            (GatewayErrorKind::Card, Some("expired_card")) => PaymentError::CardExpired,
            (GatewayErrorKind::Card, Some("incorrect_cvc")) => PaymentError::IncorrectCvc,
            _ => PaymentError::ProcessingFailed(err.message.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_code_translation() {
        let declined = GatewayError::card("card_declined", "declined");
        assert!(matches!(PaymentError::from_gateway(&declined), PaymentError::CardDeclined));

        let expired = GatewayError::card("expired_card", "expired");
        assert!(matches!(PaymentError::from_gateway(&expired), PaymentError::CardExpired));

        let cvc = GatewayError::card("incorrect_cvc", "bad cvc");
        assert!(matches!(PaymentError::from_gateway(&cvc), PaymentError::IncorrectCvc));
    }

    #[test]
    fn test_everything_else_is_processing_failure() {
        for err in [
            GatewayError::card("processing_error", "card issue"),
            GatewayError::invalid_request("bad amount"),
            GatewayError::api("internal"),
            GatewayError::connection("timeout"),
            GatewayError::rate_limit("throttled"),
        ] {
            assert!(matches!(
                PaymentError::from_gateway(&err),
                PaymentError::ProcessingFailed(_)
            ));
        }
    }
}
