use crate::errors::{ErrorResponse, ServiceError};
use crate::handlers::common::{Paginated, PaginationParams};
use crate::handlers::payment_webhooks;
use crate::services::payments::{
    InitiatePaymentRequest, PaymentProvider, PaymentResponse, PaymentStatus,
};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(initiate_payment).get(list_payments))
        .route("/:id", get(get_payment))
        .route("/item/:item_id", get(get_item_payments))
        .route("/sweep-expired", post(sweep_expired))
        .route("/webhook", post(payment_webhooks::provider_webhook))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InitiatePaymentBody {
    pub wishlist_item_id: Uuid,
    /// One of `usdt`, `paypal`, `credit_card`.
    #[schema(example = "usdt")]
    pub provider: String,
    /// Client-supplied idempotency token. Replaying the same token for the
    /// same item and provider returns the original payment.
    #[validate(length(min = 1, max = 255))]
    pub reference_id: String,
    pub payer_id: i64,
    /// Defaults to the wishlist item's price when omitted.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaymentListParams {
    /// Filter by lifecycle status.
    pub status: Option<String>,
}

/// Initiate a payment attempt for a wishlist item
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = InitiatePaymentBody,
    responses(
        (status = 200, description = "Payment created (or idempotent replay)", body = crate::ApiResponse<crate::services::payments::PaymentResponse>),
        (status = 404, description = "Item missing or already purchased", body = ErrorResponse),
        (status = 409, description = "Item already has an active payment", body = ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(body): Json<InitiatePaymentBody>,
) -> ApiResult<PaymentResponse> {
    body.validate()?;
    let provider = PaymentProvider::from_str(&body.provider).map_err(|_| {
        ServiceError::ValidationError(format!("unknown payment provider '{}'", body.provider))
    })?;

    let payment = state
        .services
        .payments
        .initiate_payment(InitiatePaymentRequest {
            wishlist_item_id: body.wishlist_item_id,
            provider,
            reference_id: body.reference_id,
            payer_id: body.payer_id,
            amount: body.amount,
        })
        .await?;

    Ok(Json(ApiResponse::success(payment)))
}

/// Get a payment by id
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment found", body = crate::ApiResponse<crate::services::payments::PaymentResponse>),
        (status = 404, description = "Payment not found", body = ErrorResponse)
    ),
    tag = "payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentResponse> {
    let payment = state.services.payments.get_payment(id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// List payments, optionally filtered by status
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaginationParams, PaymentListParams),
    responses((status = 200, description = "One page of payments", body = crate::ApiResponse<crate::handlers::common::Paginated<crate::services::payments::PaymentResponse>>)),
    tag = "payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<PaymentListParams>,
) -> ApiResult<Paginated<PaymentResponse>> {
    let status = match &filter.status {
        Some(raw) => Some(PaymentStatus::from_str(raw).map_err(|_| {
            ServiceError::ValidationError(format!("unknown payment status '{}'", raw))
        })?),
        None => None,
    };

    let (payments, total) = state
        .services
        .payments
        .list_payments(pagination.page(), pagination.page_size(), status)
        .await?;

    Ok(Json(ApiResponse::success(Paginated::new(
        "/api/v1/payments",
        pagination,
        total,
        payments,
    ))))
}

/// Payment history of a wishlist item, newest first
#[utoipa::path(
    get,
    path = "/api/v1/payments/item/{item_id}",
    params(("item_id" = Uuid, Path, description = "Wishlist item id")),
    responses((status = 200, description = "Payment attempts for the item", body = crate::ApiResponse<Vec<crate::services::payments::PaymentResponse>>)),
    tag = "payments"
)]
pub async fn get_item_payments(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> ApiResult<Vec<PaymentResponse>> {
    let payments = state.services.payments.get_item_payments(item_id).await?;
    Ok(Json(ApiResponse::success(payments)))
}

/// Expire stale payment attempts
///
/// Intended for an external scheduler (cron). Transitions `created` and
/// `pending` payments past the configured window to `expired` and releases
/// their wishlist items.
#[utoipa::path(
    post,
    path = "/api/v1/payments/sweep-expired",
    responses((status = 200, description = "Number of payments expired", body = crate::ApiResponse<serde_json::Value>)),
    tag = "payments"
)]
pub async fn sweep_expired(State(state): State<AppState>) -> ApiResult<Value> {
    let expired = state.services.payments.sweep_expired(Utc::now()).await?;
    Ok(Json(ApiResponse::success(json!({ "expired": expired }))))
}
