//! Stripe REST API client for payment intents.
//!
//! # Authentication
//!
//! Stripe uses a secret key as a bearer token. Idempotency is provided by
//! the `Idempotency-Key` header: the provider replays the original
//! response for a repeated key instead of creating a second intent.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use aurum_payments::{CreateIntentRequest, GatewayError, PaymentGatewayPort, PaymentIntent};

// =============================================================================
// Constants
// =============================================================================

/// Stripe REST API base URL
const STRIPE_API_URL: &str = "https://api.stripe.com";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Stripe client
// =============================================================================

/// Stripe REST client implementing the payment gateway port.
pub struct StripeClient {
    /// HTTP client
    client: Client,
    /// Secret API key
    secret_key: String,
    /// API base URL (overridable for test servers)
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url: STRIPE_API_URL.to_string(),
        }
    }

    /// Create a client against a different base URL (for testing).
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self { client: Client::new(), secret_key, base_url }
    }
}

/// Build the form body for a create-intent call.
fn intent_form(request: &CreateIntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount_minor.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("metadata[order_id]".to_string(), request.order_id.to_string()),
    ];

    if let Some(email) = &request.receipt_email {
        form.push(("receipt_email".to_string(), email.clone()));
    }

    form
}

/// Map a non-success response body into the closed gateway error union.
///
/// Stripe error bodies look like:
/// `{"error": {"type": "card_error", "code": "card_declined", "message": "..."}}`
fn classify_error_body(status: u16, body: &str) -> GatewayError {
    let parsed: Result<StripeErrorResponse, _> = serde_json::from_str(body);

    let Ok(StripeErrorResponse { error }) = parsed else {
        return GatewayError::api(format!("HTTP {}: {}", status, body));
    };

    let message = error.message.unwrap_or_else(|| format!("HTTP {}", status));

    match error.error_type.as_deref() {
        Some("card_error") => GatewayError {
            kind: aurum_payments::GatewayErrorKind::Card,
            code: error.code,
            message,
        },
        Some("invalid_request_error") => GatewayError::invalid_request(message),
        Some("rate_limit_error") => GatewayError::rate_limit(message),
        Some("api_connection_error") => GatewayError::connection(message),
        _ => GatewayError::api(message),
    }
}

#[async_trait]
impl PaymentGatewayPort for StripeClient {
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.base_url);

        debug!(
            amount_minor = request.amount_minor,
            currency = %request.currency,
            order_id = %request.order_id,
            "Creating payment intent"
        );

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client
                .post(&url)
                .bearer_auth(&self.secret_key)
                .header("Idempotency-Key", &request.idempotency_key)
                .form(&intent_form(request))
                .send(),
        )
        .await
        .map_err(|_| GatewayError::connection("Request timed out"))?
        .map_err(|e| GatewayError::connection(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::connection(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error_body(status.as_u16(), &body));
        }

        let intent: StripeIntentResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::api(format!("Failed to parse response: {}", e)))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| GatewayError::api("Intent response missing client_secret"))?;

        Ok(PaymentIntent { intent_id: intent.id, client_secret })
    }
}

// =============================================================================
// Stripe types (from API responses)
// =============================================================================

/// Successful intent creation response.
#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    client_secret: Option<String>,
}

/// Error response wrapper.
#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

/// Error detail.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_payments::GatewayErrorKind;
    use uuid::Uuid;

    fn request() -> CreateIntentRequest {
        CreateIntentRequest {
            amount_minor: 374948,
            currency: "usd".to_string(),
            receipt_email: Some("ada@example.com".to_string()),
            order_id: Uuid::now_v7(),
            idempotency_key: "key-1".to_string(),
        }
    }

    #[test]
    fn test_intent_form_fields() {
        let req = request();
        let form = intent_form(&req);

        assert!(form.contains(&("amount".to_string(), "374948".to_string())));
        assert!(form.contains(&("currency".to_string(), "usd".to_string())));
        assert!(form.contains(&("receipt_email".to_string(), "ada@example.com".to_string())));
        assert!(form
            .iter()
            .any(|(k, v)| k == "metadata[order_id]" && *v == req.order_id.to_string()));
    }

    #[test]
    fn test_intent_form_omits_missing_email() {
        let mut req = request();
        req.receipt_email = None;
        let form = intent_form(&req);
        assert!(!form.iter().any(|(k, _)| k == "receipt_email"));
    }

    #[test]
    fn test_classify_card_error() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        let err = classify_error_body(402, body);

        assert_eq!(err.kind, GatewayErrorKind::Card);
        assert_eq!(err.code.as_deref(), Some("card_declined"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_rate_limit_is_transient() {
        let body = r#"{"error":{"type":"rate_limit_error","message":"Too many requests"}}"#;
        let err = classify_error_body(429, body);

        assert_eq!(err.kind, GatewayErrorKind::RateLimit);
        assert!(err.is_transient());
    }

    #[test]
    fn test_classify_invalid_request_is_permanent() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Amount must be positive"}}"#;
        let err = classify_error_body(400, body);

        assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_unparseable_body_is_api_error() {
        let err = classify_error_body(500, "<html>Bad Gateway</html>");
        assert_eq!(err.kind, GatewayErrorKind::Api);
        assert!(err.is_transient());
        assert!(err.message.contains("500"));
    }

    #[test]
    fn test_classify_unknown_type_is_api_error() {
        let body = r#"{"error":{"type":"api_error","message":"Something went wrong"}}"#;
        let err = classify_error_body(500, body);
        assert_eq!(err.kind, GatewayErrorKind::Api);
    }
}
