//! Webhook signature verification and event parsing.
//!
//! Stripe signs webhook deliveries with an HMAC-SHA256 over
//! `"{timestamp}.{payload}"`, carried in a `Stripe-Signature` header of
//! the form `t=<unix>,v1=<hex>[,v1=<hex>...]`. Verification checks the
//! signature against the endpoint secret and rejects stale timestamps to
//! bound replay.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use aurum_payments::{GatewayEvent, GatewayEventKind};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed delivery.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Errors produced while handling a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Header missing or not in `t=...,v1=...` form
    #[error("Invalid signature header")]
    InvalidSignatureHeader,

    /// No candidate signature matched the payload
    #[error("Signature mismatch")]
    SignatureMismatch,

    /// Signed timestamp is outside the accepted window
    #[error("Signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    /// Payload is not a well-formed event
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),
}

/// Compute the signature for a payload at a given timestamp.
///
/// Exposed so tests and local tooling can construct valid deliveries.
pub fn sign_payload(timestamp: i64, payload: &str, secret: &str) -> String {
    // HMAC accepts keys of any length; new_from_slice cannot fail here.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a delivery's signature header against the endpoint secret.
///
/// # Errors
///
/// - `WebhookError::InvalidSignatureHeader` for an unparsable header
/// - `WebhookError::TimestampOutOfTolerance` for stale deliveries
/// - `WebhookError::SignatureMismatch` when no `v1` candidate matches
pub fn verify_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
) -> Result<(), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::InvalidSignatureHeader)?);
            },
            Some(("v1", value)) => candidates.push(value),
            _ => {},
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignatureHeader)?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignatureHeader);
    }

    let age = (Utc::now().timestamp() - timestamp).abs();
    if age > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    let expected = sign_payload(timestamp, payload, secret);
    if candidates.iter().any(|candidate| constant_time_eq(candidate, &expected)) {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Compare hex signatures without early exit on the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Parse a verified payload into a gateway event.
///
/// Returns `Ok(None)` for event types this system does not consume.
pub fn parse_event(payload: &str) -> Result<Option<GatewayEvent>, WebhookError> {
    let envelope: EventEnvelope =
        serde_json::from_str(payload).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

    let kind = match envelope.event_type.as_str() {
        "payment_intent.succeeded" => GatewayEventKind::IntentSucceeded,
        "payment_intent.payment_failed" => GatewayEventKind::IntentFailed,
        _ => return Ok(None),
    };

    Ok(Some(GatewayEvent {
        kind,
        intent_id: envelope.data.object.id,
        failure_message: envelope.data.object.last_payment_error.and_then(|e| e.message),
    }))
}

// =============================================================================
// Event payload types
// =============================================================================

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: IntentObject,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    last_payment_error: Option<PaymentErrorObject>,
}

#[derive(Debug, Deserialize)]
struct PaymentErrorObject {
    message: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn signed_header(payload: &str) -> String {
        let timestamp = Utc::now().timestamp();
        format!("t={},v1={}", timestamp, sign_payload(timestamp, payload, SECRET))
    }

    #[test]
    fn test_valid_signature_verifies() {
        let payload = r#"{"type":"payment_intent.succeeded"}"#;
        let header = signed_header(payload);
        assert!(verify_signature(payload, &header, SECRET).is_ok());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let payload = r#"{"type":"payment_intent.succeeded"}"#;
        let header = signed_header(payload);

        let result = verify_signature(r#"{"type":"tampered"}"#, &header, SECRET);
        assert!(matches!(result, Err(WebhookError::SignatureMismatch)));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let payload = r#"{"type":"payment_intent.succeeded"}"#;
        let header = signed_header(payload);

        let result = verify_signature(payload, &header, "whsec_other");
        assert!(matches!(result, Err(WebhookError::SignatureMismatch)));
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let payload = r#"{}"#;
        let old = Utc::now().timestamp() - 10_000;
        let header = format!("t={},v1={}", old, sign_payload(old, payload, SECRET));

        let result = verify_signature(payload, &header, SECRET);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfTolerance)));
    }

    #[test]
    fn test_garbage_header_is_rejected() {
        assert!(matches!(
            verify_signature("{}", "not-a-header", SECRET),
            Err(WebhookError::InvalidSignatureHeader)
        ));
        assert!(matches!(
            verify_signature("{}", "t=notanumber,v1=aa", SECRET),
            Err(WebhookError::InvalidSignatureHeader)
        ));
        assert!(matches!(
            verify_signature("{}", "t=123", SECRET),
            Err(WebhookError::InvalidSignatureHeader)
        ));
    }

    #[test]
    fn test_any_matching_v1_candidate_passes() {
        let payload = r#"{}"#;
        let timestamp = Utc::now().timestamp();
        let good = sign_payload(timestamp, payload, SECRET);
        let header = format!("t={},v1={},v1={}", timestamp, "00".repeat(32), good);

        assert!(verify_signature(payload, &header, SECRET).is_ok());
    }

    #[test]
    fn test_parse_succeeded_event() {
        let payload = r#"{
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_123"}}
        }"#;

        let event = parse_event(payload).unwrap().unwrap();
        assert_eq!(event.kind, GatewayEventKind::IntentSucceeded);
        assert_eq!(event.intent_id, "pi_123");
        assert!(event.failure_message.is_none());
    }

    #[test]
    fn test_parse_failed_event_with_reason() {
        let payload = r#"{
            "type": "payment_intent.payment_failed",
            "data": {"object": {
                "id": "pi_456",
                "last_payment_error": {"message": "Your card has insufficient funds."}
            }}
        }"#;

        let event = parse_event(payload).unwrap().unwrap();
        assert_eq!(event.kind, GatewayEventKind::IntentFailed);
        assert_eq!(event.intent_id, "pi_456");
        assert_eq!(
            event.failure_message.as_deref(),
            Some("Your card has insufficient funds.")
        );
    }

    #[test]
    fn test_parse_unconsumed_event_type() {
        let payload = r#"{
            "type": "charge.refunded",
            "data": {"object": {"id": "ch_789"}}
        }"#;

        assert!(parse_event(payload).unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed_payload() {
        assert!(matches!(
            parse_event("not json"),
            Err(WebhookError::MalformedPayload(_))
        ));
    }
}
