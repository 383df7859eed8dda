//! HTTP API for the Aurum daemon.
//!
//! Thin binding layer: extracts identifiers and DTOs, calls the services,
//! and maps domain errors to status codes. Authentication happens
//! upstream; the caller's identity arrives as an `X-User-Id` header.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use aurum_domain::{ProductId, ShippingInfo, UserId};
use aurum_gateway::{parse_event, verify_signature};
use aurum_orders::{CartService, CartView, OrderError, OrderService, OrderSummary};
use aurum_payments::{PaymentError, PaymentGatewayPort, PaymentService};
use aurum_store::{ProductRepository, Store, StoreError};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S, C, G>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    pub carts: CartService<S, C>,
    pub orders: OrderService<S>,
    pub payments: PaymentService<S, G>,
    /// Endpoint secret for webhook signature verification
    pub webhook_secret: String,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Request to add a product to the cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Request to overwrite a cart line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// Request to convert the cart into an order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub recipient: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Privileged status update request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Request to create or retry a payment intent.
#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub idempotency_key: String,
}

/// Payment intent response.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S, C, G>(state: Arc<ApiState<S, C, G>>) -> Router
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/cart", get(get_cart_handler))
        .route("/cart/items", post(add_item_handler))
        .route("/cart/items/:product_id", patch(update_item_handler))
        .route("/cart/items/:product_id", delete(remove_item_handler))
        .route("/orders", post(create_order_handler))
        .route("/orders", get(orders_history_handler))
        .route("/orders/:id", get(get_order_handler))
        .route("/orders/:id/cancel", post(cancel_order_handler))
        .route("/orders/:id/status", patch(update_status_handler))
        .route("/orders/:id/payment-intent", post(create_intent_handler))
        .route("/orders/:id/payment/retry", post(retry_payment_handler))
        .route("/webhooks/payments", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get the caller's cart.
async fn get_cart_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
) -> Result<Json<CartView>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let view = state.carts.get_cart(user_id).await.map_err(order_error_response)?;
    Ok(Json(view))
}

/// Add a product to the caller's cart.
async fn add_item_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let view = state
        .carts
        .add_item(user_id, req.product_id, req.quantity)
        .await
        .map_err(order_error_response)?;
    Ok(Json(view))
}

/// Overwrite a cart line's quantity (zero removes it).
async fn update_item_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let view = state
        .carts
        .update_item(user_id, product_id, req.quantity)
        .await
        .map_err(order_error_response)?;
    Ok(Json(view))
}

/// Remove a product from the caller's cart.
async fn remove_item_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let view = state
        .carts
        .remove_item(user_id, product_id)
        .await
        .map_err(order_error_response)?;
    Ok(Json(view))
}

/// Convert the caller's cart into an order.
async fn create_order_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderSummary>), ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;

    let shipping = ShippingInfo::new(
        req.recipient,
        req.email,
        req.address,
        req.city,
        req.postal_code,
        req.country,
    )
    .map_err(|e| bad_request(e.to_string()))?;

    let summary = state
        .orders
        .create_order_from_cart(user_id, shipping)
        .await
        .map_err(order_error_response)?;

    Ok((StatusCode::CREATED, Json(summary)))
}

/// The caller's order history, newest first.
async fn orders_history_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderSummary>>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let history =
        state.orders.get_orders_history(user_id).await.map_err(order_error_response)?;
    Ok(Json(history))
}

/// Get a single order.
async fn get_order_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderSummary>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let summary = state
        .orders
        .get_order_info(user_id, order_id)
        .await
        .map_err(order_error_response)?;
    Ok(Json(summary))
}

/// Cancel an order.
async fn cancel_order_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    state.orders.cancel_order(user_id, order_id).await.map_err(order_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Privileged status update (operator path, RBAC enforced upstream).
async fn update_status_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    state
        .orders
        .update_order_status(order_id, &req.status)
        .await
        .map_err(order_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a payment intent for an order.
async fn create_intent_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let client_secret = state
        .payments
        .create_payment_intent(order_id, &req.idempotency_key)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}

/// Retry a failed order payment.
async fn retry_payment_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let user_id = user_id_from_headers(&headers)?;
    let client_secret = state
        .payments
        .retry_order_payment(user_id, order_id, &req.idempotency_key)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}

/// Signed gateway webhook deliveries.
async fn webhook_handler<S, C, G>(
    State(state): State<Arc<ApiState<S, C, G>>>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| bad_request("Missing Stripe-Signature header".to_string()))?;

    verify_signature(&body, signature, &state.webhook_secret)
        .map_err(|e| bad_request(e.to_string()))?;

    let Some(event) = parse_event(&body).map_err(|e| bad_request(e.to_string()))? else {
        // Event type we do not consume; acknowledge so the provider
        // stops redelivering it.
        return Ok(StatusCode::OK);
    };

    state.payments.handle_gateway_event(&event).await.map_err(payment_error_response)?;
    Ok(StatusCode::OK)
}

// =============================================================================
// Error mapping
// =============================================================================

fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get("X-User-Id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse { error: "Missing or invalid X-User-Id header".to_string() }),
        ))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Duplicate { .. } => StatusCode::CONFLICT,
        StoreError::InsufficientStock { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn order_error_response(err: OrderError) -> ApiError {
    let status = match &err {
        OrderError::CartEmpty => StatusCode::BAD_REQUEST,
        OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
        OrderError::ProductUnavailable(_) => StatusCode::NOT_FOUND,
        OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::OrderNotOwned(_) => StatusCode::FORBIDDEN,
        OrderError::CannotCancel(_) => StatusCode::CONFLICT,
        OrderError::CannotChangeStatus(_) => StatusCode::CONFLICT,
        OrderError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        OrderError::Domain(_) => StatusCode::BAD_REQUEST,
        OrderError::Store(store_err) => store_status(store_err),
    };

    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn payment_error_response(err: PaymentError) -> ApiError {
    let status = match &err {
        PaymentError::CardDeclined
        | PaymentError::CardExpired
        | PaymentError::IncorrectCvc => StatusCode::PAYMENT_REQUIRED,
        PaymentError::ProcessingFailed(_) => StatusCode::BAD_GATEWAY,
        PaymentError::TooManyRetries(_) => StatusCode::TOO_MANY_REQUESTS,
        PaymentError::OrderAlreadyPaid(_) | PaymentError::OrderCancelled(_) => {
            StatusCode::CONFLICT
        },
        PaymentError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        PaymentError::OrderNotOwned(_) => StatusCode::FORBIDDEN,
        PaymentError::Store(store_err) => store_status(store_err),
    };

    (status, Json(ErrorResponse { error: err.to_string() }))
}

// =============================================================================
// Tests
// =============================================================================
