//! Stub gateway for testing.
//!
//! Outcomes are scripted per call; every call is recorded so tests can
//! assert attempt counts and idempotency-key reuse. Successful intents
//! are deduplicated by idempotency key, mirroring the real provider's
//! guarantee.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::ports::{CreateIntentRequest, GatewayError, PaymentGatewayPort, PaymentIntent};

/// One recorded gateway call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub idempotency_key: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Scripted stub gateway.
pub struct StubGateway {
    /// Outcome script, consumed front to back; an empty script succeeds
    script: Mutex<VecDeque<Result<(), GatewayError>>>,
    /// Every call made, in order
    calls: Mutex<Vec<RecordedCall>>,
    /// Intents created, keyed by idempotency key
    intents: Mutex<HashMap<String, PaymentIntent>>,
    /// Counter for generating intent ids
    counter: Mutex<u64>,
}

impl StubGateway {
    /// Create a stub that succeeds on every call.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            intents: Mutex::new(HashMap::new()),
            counter: Mutex::new(0),
        }
    }

    /// Script the next call to succeed.
    pub fn push_success(&self) {
        self.script.lock().unwrap().push_back(Ok(()));
    }

    /// Script the next call to fail.
    pub fn push_error(&self, error: GatewayError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of distinct intents actually created at the "provider".
    pub fn created_intent_count(&self) -> usize {
        self.intents.lock().unwrap().len()
    }

    fn next_intent(&self) -> PaymentIntent {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        PaymentIntent {
            intent_id: format!("pi_stub_{}", *counter),
            client_secret: format!("pi_stub_{}_secret", *counter),
        }
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGatewayPort for StubGateway {
    async fn create_intent(
        &self,
        request: &CreateIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls.lock().unwrap().push(RecordedCall {
            idempotency_key: request.idempotency_key.clone(),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
        });

        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        outcome?;

        // Idempotent replay: the same key yields the same intent, never a
        // second one.
        let mut intents = self.intents.lock().unwrap();
        if let Some(existing) = intents.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        let intent = self.next_intent();
        intents.insert(request.idempotency_key.clone(), intent.clone());
        Ok(intent)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(key: &str) -> CreateIntentRequest {
        CreateIntentRequest {
            amount_minor: 374948,
            currency: "usd".to_string(),
            receipt_email: None,
            order_id: Uuid::now_v7(),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_stub_succeeds_by_default() {
        let gateway = StubGateway::new();
        let intent = gateway.create_intent(&request("key-1")).await.unwrap();
        assert!(intent.intent_id.starts_with("pi_stub_"));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stub_scripted_failures_then_success() {
        let gateway = StubGateway::new();
        gateway.push_error(GatewayError::connection("timeout"));
        gateway.push_success();

        assert!(gateway.create_intent(&request("key-1")).await.is_err());
        assert!(gateway.create_intent(&request("key-1")).await.is_ok());
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stub_replays_intent_for_same_key() {
        let gateway = StubGateway::new();

        let first = gateway.create_intent(&request("key-1")).await.unwrap();
        let replay = gateway.create_intent(&request("key-1")).await.unwrap();
        let other = gateway.create_intent(&request("key-2")).await.unwrap();

        assert_eq!(first.intent_id, replay.intent_id);
        assert_ne!(first.intent_id, other.intent_id);
        assert_eq!(gateway.created_intent_count(), 2);
    }
}
