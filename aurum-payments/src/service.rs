//! Payment intent orchestration and the order-level retry governor.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use aurum_domain::{OrderId, OrderStatus, Payment, PaymentStatus, UserId};
use aurum_store::{OrderRepository, PaymentRepository, Store};

use crate::error::PaymentError;
use crate::ports::{
    CreateIntentRequest, GatewayEvent, GatewayEventKind, PaymentGatewayPort,
};

/// Attempts one logical intent creation may make against the gateway.
pub const MAX_INTENT_ATTEMPTS: u32 = 3;

/// Payment rows an order may accumulate before further retries are
/// refused. A coarse ceiling above the per-call loop, meant to force
/// human intervention instead of unbounded automation.
pub const MAX_ATTEMPTS_PER_ORDER: i64 = 3;

/// Upper bound of the random backoff jitter.
const JITTER_MAX_MS: u64 = 100;

/// Payment intent orchestration against the gateway.
pub struct PaymentService<S: Store, G: PaymentGatewayPort> {
    store: Arc<S>,
    gateway: Arc<G>,
    /// ISO currency code charged for all orders (e.g., "usd")
    currency: String,
}

impl<S: Store, G: PaymentGatewayPort> PaymentService<S, G> {
    /// Create a new payment service.
    pub fn new(store: Arc<S>, gateway: Arc<G>, currency: impl Into<String>) -> Self {
        Self { store, gateway, currency: currency.into() }
    }

    /// Create a gateway payment intent for an order.
    ///
    /// Retries transient gateway failures up to [`MAX_INTENT_ATTEMPTS`]
    /// times, sleeping `attempt seconds + 0..100ms jitter` between
    /// attempts. Every attempt carries the same `idempotency_key`, so a
    /// retried call can never double-charge. Permanent failures (card or
    /// validation errors) stop the loop immediately.
    ///
    /// Exactly one Payment row is recorded per call: `pending` with the
    /// provider intent id on success, `failed` with the reason otherwise.
    ///
    /// Returns the intent's client secret.
    pub async fn create_payment_intent(
        &self,
        order_id: OrderId,
        idempotency_key: &str,
    ) -> Result<String, PaymentError> {
        let order = self
            .store
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        let request = CreateIntentRequest {
            amount_minor: to_minor_units(order.total_amount)?,
            currency: self.currency.clone(),
            receipt_email: Some(order.shipping.email.clone()),
            order_id,
            idempotency_key: idempotency_key.to_string(),
        };

        let mut attempt = 1;
        let gateway_err = loop {
            match self.gateway.create_intent(&request).await {
                Ok(intent) => {
                    let payment = Payment::pending(
                        order.user_id,
                        order_id,
                        order.total_amount,
                        &intent.intent_id,
                    );
                    self.store.payments().insert(&payment).await?;

                    info!(
                        %order_id,
                        intent_id = %intent.intent_id,
                        attempt,
                        "Payment intent created"
                    );
                    return Ok(intent.client_secret);
                },
                Err(e) if e.is_transient() && attempt < MAX_INTENT_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        %order_id,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Transient gateway failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => break e,
            }
        };

        // Permanent failure or exhausted retries: record the attempt and
        // translate once at this boundary.
        warn!(%order_id, attempt, error = %gateway_err, "Payment intent failed");

        let payment = Payment::failed(
            order.user_id,
            order_id,
            order.total_amount,
            gateway_err.to_string(),
        );
        self.store.payments().insert(&payment).await?;

        Err(PaymentError::from_gateway(&gateway_err))
    }

    /// Retry a failed order payment, within the order-level budget.
    ///
    /// The caller supplies a fresh logical `idempotency_key`. It must
    /// differ from earlier attempts' keys, otherwise the gateway would
    /// replay the old intent instead of creating a new one.
    pub async fn retry_order_payment(
        &self,
        user_id: UserId,
        order_id: OrderId,
        idempotency_key: &str,
    ) -> Result<String, PaymentError> {
        let order = self
            .store
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if !order.is_owned_by(user_id) {
            return Err(PaymentError::OrderNotOwned(order_id));
        }

        match order.status {
            OrderStatus::Paid => return Err(PaymentError::OrderAlreadyPaid(order_id)),
            OrderStatus::Cancelled => return Err(PaymentError::OrderCancelled(order_id)),
            _ => {},
        }

        // Budget check happens before any gateway traffic.
        let attempts = self.store.payments().count_by_order(order_id).await?;
        if attempts > MAX_ATTEMPTS_PER_ORDER {
            warn!(%order_id, attempts, "Payment retry budget exhausted");
            return Err(PaymentError::TooManyRetries(order_id));
        }

        self.create_payment_intent(order_id, idempotency_key).await
    }

    /// Apply a verified gateway webhook event.
    ///
    /// Success settles the Payment row and drives the order's
    /// `pending → paid` transition; an event for an order already in a
    /// terminal state is logged and ignored. Failure events record the
    /// reason on the Payment row.
    pub async fn handle_gateway_event(&self, event: &GatewayEvent) -> Result<(), PaymentError> {
        let payment = match self.store.payments().find_by_provider_id(&event.intent_id).await? {
            Some(payment) => payment,
            None => {
                warn!(intent_id = %event.intent_id, "Gateway event for unknown intent, ignoring");
                return Ok(());
            },
        };

        match event.kind {
            GatewayEventKind::IntentSucceeded => {
                self.store
                    .payments()
                    .update_status(payment.id, PaymentStatus::Succeeded, None)
                    .await?;

                let order = self
                    .store
                    .orders()
                    .find_by_id(payment.order_id)
                    .await?
                    .ok_or(PaymentError::OrderNotFound(payment.order_id))?;

                if order.status == OrderStatus::Pending {
                    self.store
                        .orders()
                        .update_status(order.id, OrderStatus::Paid)
                        .await?;
                    info!(order_id = %order.id, intent_id = %event.intent_id, "Order paid");
                } else {
                    warn!(
                        order_id = %order.id,
                        status = %order.status,
                        "Late success event for non-pending order, ignoring"
                    );
                }
            },
            GatewayEventKind::IntentFailed => {
                let reason = event.failure_message.as_deref().unwrap_or("unknown failure");
                self.store
                    .payments()
                    .update_status(payment.id, PaymentStatus::Failed, Some(reason))
                    .await?;
                info!(
                    order_id = %payment.order_id,
                    intent_id = %event.intent_id,
                    reason,
                    "Payment attempt failed at gateway"
                );
            },
        }

        Ok(())
    }
}

/// Backoff before the next attempt: `attempt` whole seconds plus up to
/// 100ms of uniform jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
    Duration::from_secs(u64::from(attempt)) + Duration::from_millis(jitter)
}

/// Convert a store-currency amount to the gateway's minor unit.
///
/// Exact-or-error: sub-cent precision means the amount cannot be charged
/// faithfully, so it is rejected rather than rounded.
fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    let minor = amount * Decimal::from(100);

    if !minor.fract().is_zero() {
        return Err(PaymentError::ProcessingFailed(format!(
            "Amount {} has sub-cent precision",
            amount
        )));
    }

    minor.to_i64().ok_or_else(|| {
        PaymentError::ProcessingFailed(format!("Amount {} out of range", amount))
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayError;
    use crate::stub::StubGateway;
    use aurum_domain::{Order, ShippingInfo};
    use aurum_store::{CheckoutPlan, MemoryStore};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn shipping() -> ShippingInfo {
        ShippingInfo::new("Ada Lovelace", "ada@example.com", "12 Gem Street", "London", "E1 6AN", "UK")
            .unwrap()
    }

    fn test_service(
    ) -> (Arc<MemoryStore>, Arc<StubGateway>, PaymentService<MemoryStore, StubGateway>) {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::new());
        let service = PaymentService::new(store.clone(), gateway.clone(), "usd");
        (store, gateway, service)
    }

    async fn seed_order(store: &MemoryStore, user_id: Uuid, total: Decimal) -> Order {
        let order = Order::new(user_id, total, shipping());
        let plan = CheckoutPlan { order: order.clone(), items: vec![], cart_id: Uuid::now_v7() };
        store.checkout(&plan).await.unwrap();
        order
    }

    // Minor unit conversion
    #[test]
    fn test_to_minor_units_exact() {
        assert_eq!(to_minor_units(dec!(3749.48)).unwrap(), 374948);
        assert_eq!(to_minor_units(dec!(650)).unwrap(), 65000);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
    }

    #[test]
    fn test_to_minor_units_rejects_sub_cent() {
        assert!(matches!(
            to_minor_units(dec!(10.999)),
            Err(PaymentError::ProcessingFailed(_))
        ));
    }

    // Intent creation
    #[tokio::test]
    async fn test_create_intent_success_records_pending_payment() {
        let (store, gateway, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(3749.48)).await;

        let secret = service.create_payment_intent(order.id, "key-1").await.unwrap();
        assert!(secret.ends_with("_secret"));

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].amount_minor, 374948);
        assert_eq!(calls[0].currency, "usd");

        let payments = store.payments().find_by_order(order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
        assert_eq!(payments[0].amount, dec!(3749.48));
        assert!(payments[0].provider_payment_id.is_some());
    }

    #[tokio::test]
    async fn test_create_intent_unknown_order() {
        let (_, _, service) = test_service();
        let result = service.create_payment_intent(Uuid::now_v7(), "key-1").await;
        assert!(matches!(result, Err(PaymentError::OrderNotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_with_same_key() {
        let (store, gateway, service) = test_service();
        let order = seed_order(&store, Uuid::now_v7(), dec!(100)).await;

        // Attempts 1 and 2 fail transiently, attempt 3 succeeds.
        gateway.push_error(GatewayError::connection("timeout"));
        gateway.push_error(GatewayError::api("internal"));
        gateway.push_success();

        let secret = service.create_payment_intent(order.id, "key-1").await.unwrap();

        // Exactly 3 calls, all carrying the identical idempotency key,
        // and the returned secret is the 3rd attempt's.
        let calls = gateway.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.idempotency_key == "key-1"));
        assert_eq!(secret, "pi_stub_1_secret");

        // One logical call, one distinct provider intent.
        assert_eq!(gateway.created_intent_count(), 1);

        // One Payment row for the whole logical call.
        let payments = store.payments().find_by_order(order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_record_failure() {
        let (store, gateway, service) = test_service();
        let order = seed_order(&store, Uuid::now_v7(), dec!(100)).await;

        for _ in 0..3 {
            gateway.push_error(GatewayError::connection("timeout"));
        }

        let result = service.create_payment_intent(order.id, "key-1").await;
        assert!(matches!(result, Err(PaymentError::ProcessingFailed(_))));
        assert_eq!(gateway.call_count(), 3);

        let payments = store.payments().find_by_order(order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Failed);
        assert!(payments[0].failure_reason.is_some());
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let (store, gateway, service) = test_service();
        let order = seed_order(&store, Uuid::now_v7(), dec!(100)).await;

        gateway.push_error(GatewayError::card("card_declined", "declined"));

        let result = service.create_payment_intent(order.id, "key-1").await;
        assert!(matches!(result, Err(PaymentError::CardDeclined)));

        // No retry after a permanent error.
        assert_eq!(gateway.call_count(), 1);

        let payments = store.payments().find_by_order(order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_card_error_translation() {
        let (store, gateway, service) = test_service();

        for (code, check) in [
            ("expired_card", PaymentError::CardExpired),
            ("incorrect_cvc", PaymentError::IncorrectCvc),
        ] {
            let order = seed_order(&store, Uuid::now_v7(), dec!(100)).await;
            gateway.push_error(GatewayError::card(code, "rejected"));

            let result = service.create_payment_intent(order.id, "key").await;
            match (result, check) {
                (Err(PaymentError::CardExpired), PaymentError::CardExpired) => {},
                (Err(PaymentError::IncorrectCvc), PaymentError::IncorrectCvc) => {},
                (other, _) => panic!("Unexpected translation for {}: {:?}", code, other),
            }
        }
    }

    // Retry governor
    #[tokio::test]
    async fn test_retry_requires_ownership() {
        let (store, _, service) = test_service();
        let owner = Uuid::now_v7();
        let order = seed_order(&store, owner, dec!(100)).await;

        let result = service.retry_order_payment(Uuid::now_v7(), order.id, "key").await;
        assert!(matches!(result, Err(PaymentError::OrderNotOwned(_))));
    }

    #[tokio::test]
    async fn test_retry_rejects_settled_orders() {
        let (store, _, service) = test_service();
        let user_id = Uuid::now_v7();

        let paid = seed_order(&store, user_id, dec!(100)).await;
        store.orders().update_status(paid.id, OrderStatus::Paid).await.unwrap();
        let result = service.retry_order_payment(user_id, paid.id, "key").await;
        assert!(matches!(result, Err(PaymentError::OrderAlreadyPaid(_))));

        let cancelled = seed_order(&store, user_id, dec!(100)).await;
        store.orders().update_status(cancelled.id, OrderStatus::Cancelled).await.unwrap();
        let result = service.retry_order_payment(user_id, cancelled.id, "key").await;
        assert!(matches!(result, Err(PaymentError::OrderCancelled(_))));
    }

    #[tokio::test]
    async fn test_retry_budget_is_enforced_before_gateway_traffic() {
        let (store, gateway, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(100)).await;

        // Four prior failed attempts: over the budget of 3.
        for i in 0..4 {
            let payment =
                Payment::failed(user_id, order.id, dec!(100), format!("attempt {}", i));
            store.payments().insert(&payment).await.unwrap();
        }

        let result = service.retry_order_payment(user_id, order.id, "key").await;
        assert!(matches!(result, Err(PaymentError::TooManyRetries(_))));

        // The gateway was never consulted.
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_within_budget_delegates() {
        let (store, gateway, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(100)).await;

        // Exactly at the cap is still allowed ("exceeds" is strict).
        for i in 0..3 {
            let payment =
                Payment::failed(user_id, order.id, dec!(100), format!("attempt {}", i));
            store.payments().insert(&payment).await.unwrap();
        }

        let secret = service.retry_order_payment(user_id, order.id, "fresh-key").await.unwrap();
        assert!(!secret.is_empty());
        assert_eq!(gateway.call_count(), 1);
        assert_eq!(gateway.calls()[0].idempotency_key, "fresh-key");
    }

    // Webhook settlement
    #[tokio::test]
    async fn test_success_event_settles_payment_and_order() {
        let (store, _, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(100)).await;

        service.create_payment_intent(order.id, "key-1").await.unwrap();
        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        let intent_id = payment.provider_payment_id.clone().unwrap();

        let event = GatewayEvent {
            kind: GatewayEventKind::IntentSucceeded,
            intent_id,
            failure_message: None,
        };
        service.handle_gateway_event(&event).await.unwrap();

        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        assert_eq!(payment.status, PaymentStatus::Succeeded);

        let order = store.orders().find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_late_success_event_leaves_terminal_order_alone() {
        let (store, _, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(100)).await;

        service.create_payment_intent(order.id, "key-1").await.unwrap();
        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        let intent_id = payment.provider_payment_id.clone().unwrap();

        store.orders().update_status(order.id, OrderStatus::Cancelled).await.unwrap();

        let event = GatewayEvent {
            kind: GatewayEventKind::IntentSucceeded,
            intent_id,
            failure_message: None,
        };
        service.handle_gateway_event(&event).await.unwrap();

        // The payment settles, but the cancelled order is not resurrected.
        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        assert_eq!(payment.status, PaymentStatus::Succeeded);

        let order = store.orders().find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_failure_event_records_reason() {
        let (store, _, service) = test_service();
        let user_id = Uuid::now_v7();
        let order = seed_order(&store, user_id, dec!(100)).await;

        service.create_payment_intent(order.id, "key-1").await.unwrap();
        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        let intent_id = payment.provider_payment_id.clone().unwrap();

        let event = GatewayEvent {
            kind: GatewayEventKind::IntentFailed,
            intent_id,
            failure_message: Some("insufficient funds".to_string()),
        };
        service.handle_gateway_event(&event).await.unwrap();

        let payment = &store.payments().find_by_order(order.id).await.unwrap()[0];
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("insufficient funds"));

        // The order stays pending, eligible for a retry.
        let order = store.orders().find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_intent_event_is_ignored() {
        let (_, _, service) = test_service();

        let event = GatewayEvent {
            kind: GatewayEventKind::IntentSucceeded,
            intent_id: "pi_unknown".to_string(),
            failure_message: None,
        };
        assert!(service.handle_gateway_event(&event).await.is_ok());
    }
}
