//! Payment gateway port definitions.
//!
//! The port is the seam between orchestration and the concrete provider.
//! Gateway failures cross it as a closed tagged union: the adapter
//! classifies once at the boundary, and no downstream code ever inspects
//! a raw provider error again.

use async_trait::async_trait;
use aurum_domain::OrderId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Gateway Port
// =============================================================================

/// Port for creating payment intents.
///
/// Implementations:
/// - `StubGateway` - For testing (scripted outcomes, recorded calls)
/// - `StripeClient` - Real provider adapter (aurum-gateway)
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// Create a payment intent.
    ///
    /// Repeated calls with the same `idempotency_key` must have at most
    /// one effect at the provider; the orchestrator relies on this when it
    /// retries transient failures.
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;
}

/// Everything the gateway needs to create one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentRequest {
    /// Amount in the currency's minor unit (cents)
    pub amount_minor: i64,
    /// ISO currency code (e.g., "usd")
    pub currency: String,
    /// Receipt address, when one is known
    pub receipt_email: Option<String>,
    /// Order this intent pays for (attached as metadata)
    pub order_id: OrderId,
    /// Caller-supplied idempotency token, reused verbatim on every retry
    /// of the same logical call
    pub idempotency_key: String,
}

/// A successfully created intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-assigned intent id
    pub intent_id: String,
    /// Secret the frontend uses to confirm the payment
    pub client_secret: String,
}

// =============================================================================
// Gateway errors
// =============================================================================

/// Classification of a gateway failure.
///
/// Card and validation failures are permanent: the same request will keep
/// failing, so retrying is pointless. Connectivity, provider-internal, and
/// throttling failures are transient and worth a bounded retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayErrorKind {
    /// Card rejected by the issuer (declined, expired, bad CVC, ...)
    Card,
    /// Request failed provider-side validation
    InvalidRequest,
    /// Provider-internal API failure
    Api,
    /// Network failure reaching the provider
    Connection,
    /// Request throttled by the provider
    RateLimit,
}

/// A classified gateway failure.
#[derive(Debug, Clone, Error)]
#[error("Gateway error [{kind:?}{}]: {message}", .code.as_deref().map(|c| format!("/{c}")).unwrap_or_default())]
pub struct GatewayError {
    /// Failure class, drives retry decisions
    pub kind: GatewayErrorKind,
    /// Provider error code (e.g., "card_declined"), when reported
    pub code: Option<String>,
    /// Human-readable provider message
    pub message: String,
}

impl GatewayError {
    /// Card rejection with a provider code.
    pub fn card(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: GatewayErrorKind::Card, code: Some(code.into()), message: message.into() }
    }

    /// Provider-side validation failure.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self { kind: GatewayErrorKind::InvalidRequest, code: None, message: message.into() }
    }

    /// Provider-internal failure.
    pub fn api(message: impl Into<String>) -> Self {
        Self { kind: GatewayErrorKind::Api, code: None, message: message.into() }
    }

    /// Network failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self { kind: GatewayErrorKind::Connection, code: None, message: message.into() }
    }

    /// Throttled.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self { kind: GatewayErrorKind::RateLimit, code: None, message: message.into() }
    }

    /// Whether a retry of the identical request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            GatewayErrorKind::Api | GatewayErrorKind::Connection | GatewayErrorKind::RateLimit
        )
    }
}

// =============================================================================
// Gateway events (webhooks)
// =============================================================================

/// What a gateway webhook reported about an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEventKind {
    /// The intent was confirmed and the charge succeeded
    IntentSucceeded,
    /// The intent failed after confirmation was attempted
    IntentFailed,
}

/// A verified, parsed gateway event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    /// Provider intent id the event refers to
    pub intent_id: String,
    /// Failure detail on `IntentFailed` events
    pub failure_message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
