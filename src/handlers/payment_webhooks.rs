//! Inbound payment provider webhooks.
//!
//! Providers retry until they see a 2xx, so every event that was understood
//! is acknowledged with 200 even when it changes nothing: duplicates and
//! invalid transitions are absorbed (and logged) rather than bounced.

use crate::errors::ServiceError;
use crate::services::payments::PaymentStatus;
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::str::FromStr;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_HEADER: &str = "x-timestamp";
const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Deserialize)]
struct ProviderEvent {
    reference_id: String,
    status: String,
    #[serde(default)]
    transaction_id: Option<String>,
}

/// Provider status webhook
///
/// Expects `{"reference_id": "...", "status": "...", "transaction_id": "..."}`.
/// When a webhook secret is configured, requests must carry `x-timestamp`
/// and `x-signature` (hex HMAC-SHA256 over `"{timestamp}.{body}"`).
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = serde_json::Value, content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Malformed event"),
        (status = 401, description = "Signature verification failed"),
        (status = 404, description = "Unknown reference id")
    ),
    tag = "payments"
)]
pub async fn provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    if let Some(secret) = &state.config.payment.webhook_secret {
        verify_signature(
            secret,
            state.config.payment.webhook_tolerance_secs,
            &headers,
            &body,
        )?;
    }

    let event: ProviderEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("malformed webhook payload: {}", e)))?;

    let status = PaymentStatus::from_str(&event.status).map_err(|_| {
        ServiceError::BadRequest(format!("unknown payment status '{}'", event.status))
    })?;

    let outcome = state
        .services
        .payments
        .record_provider_event(&event.reference_id, status, event.transaction_id)
        .await?;

    info!(reference_id = %event.reference_id, %status, ?outcome, "provider event acknowledged");
    Ok(Json(ApiResponse::success(json!({ "outcome": outcome }))))
}

/// Checks the timestamped HMAC signature. The timestamp guards against
/// replay; the MAC comparison is constant-time via `verify_slice`.
fn verify_signature(
    secret: &str,
    tolerance_secs: u64,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ServiceError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    let signature = header_str(headers, SIGNATURE_HEADER)?;

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ServiceError::Unauthorized("invalid webhook timestamp".to_string()))?;
    let skew = (Utc::now().timestamp() - ts).unsigned_abs();
    if skew > tolerance_secs {
        warn!(skew, "webhook timestamp outside tolerance");
        return Err(ServiceError::Unauthorized(
            "webhook timestamp outside tolerance".to_string(),
        ));
    }

    let expected = hex::decode(signature)
        .map_err(|_| ServiceError::Unauthorized("invalid webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("webhook secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ServiceError::Unauthorized("webhook signature mismatch".to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ServiceError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_headers(secret: &str, timestamp: String, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let sig = sign(secret, &timestamp, body);
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&timestamp).unwrap());
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        headers
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"reference_id":"ref-1","status":"succeeded"}"#;
        let ts = Utc::now().timestamp().to_string();
        let headers = signed_headers("shh", ts, body);
        assert!(verify_signature("shh", 300, &headers, body).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let body = br#"{"reference_id":"ref-1","status":"succeeded"}"#;
        let ts = Utc::now().timestamp().to_string();
        let headers = signed_headers("shh", ts, body);
        let err = verify_signature("shh", 300, &headers, b"{}").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = b"{}";
        let ts = (Utc::now().timestamp() - 3600).to_string();
        let headers = signed_headers("shh", ts, body);
        let err = verify_signature("shh", 300, &headers, body).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn rejects_missing_headers() {
        let err = verify_signature("shh", 300, &HeaderMap::new(), b"{}").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
