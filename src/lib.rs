//! wishmall-api library
//!
//! Multi-site wishlist e-commerce backend: catalog, wishlists, the payment
//! lifecycle and its linkage invariants, invitation-based accounts, and a
//! Telegram notification relay.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Uniform response envelope: `code` is 0 for success and 1 for failures,
/// `message` is "success" or a human-readable error, and `data` carries the
/// payload. Every endpoint, including site-config errors, uses this shape.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Enhanced API routes function
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Wishlist API
        .nest("/wishlist", handlers::wishlist::wishlist_routes())
        // Payments API (incl. provider webhook and expiry sweep)
        .nest("/payments", handlers::payments::payment_routes())
        // Users API (registration, invitation graph, bans)
        .nest("/users", handlers::users::user_routes())
        // Site registry API
        .nest("/sites", handlers::sites::site_routes())
        // Telegram relay
        .nest("/telegram", handlers::telegram::telegram_routes())
}

async fn api_status() -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "wishmall-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_envelope_uses_code_zero() {
        let response = ApiResponse::success(json!({"ok": true}));
        assert_eq!(response.code, 0);
        assert_eq!(response.message, "success");

        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized["code"], 0);
        assert_eq!(serialized["message"], "success");
        assert_eq!(serialized["data"]["ok"], true);
    }
}
