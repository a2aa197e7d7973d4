//! Shared test harness: in-memory SQLite, migrated schema, real services
//! and the full router.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use wishmall_api as api;
use wishmall_api::entities::{product, user};

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: api::handlers::AppServices,
    pub router: Router,
}

pub fn test_config() -> api::config::AppConfig {
    api::config::AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        environment: "test".into(),
        log_level: "info".into(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        event_channel_capacity: 64,
        payment: api::config::PaymentConfig::default(),
        telegram: api::config::TelegramConfig::default(),
        sites: vec![api::config::SiteEntry {
            id: "main".into(),
            name: "Main Mall".into(),
            theme: "default".into(),
            default_currency: "USD".into(),
            default_language: "en-US".into(),
        }],
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(test_config()).await
}

pub async fn spawn_app_with_config(config: api::config::AppConfig) -> TestApp {
    // A single connection keeps every task on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect sqlite");
    api::db::run_migrations(&db).await.expect("run migrations");
    let db = Arc::new(db);

    let (event_sender, event_rx) = api::events::channel(config.event_channel_capacity);
    let services = api::handlers::AppServices::new(db.clone(), &config, event_sender.clone());
    tokio::spawn(api::events::process_events(
        event_rx,
        db.clone(),
        services.notifier.clone(),
    ));

    let state = api::AppState {
        db: db.clone(),
        config,
        event_sender,
        services: services.clone(),
    };
    let router = Router::new()
        .nest("/api/v1", api::api_v1_routes())
        .with_state(state);

    TestApp {
        db,
        services,
        router,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::delete(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Inserts a user directly, bypassing registration.
    pub async fn seed_user(&self, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            invite_code: Set(format!("CODE{}", username.to_uppercase())),
            invited_by: Set(None),
            level: Set(0),
            is_banned: Set(false),
            ban_reason: Set(None),
            ban_until: Set(None),
            ban_count: Set(0),
            telegram_chat_id: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed user")
    }

    /// Inserts a catalog product directly.
    pub async fn seed_product(&self, name: &str, price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            currency: Set("USD".to_string()),
            site_id: Set("main".to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db.as_ref())
        .await
        .expect("seed product")
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn assert_envelope_ok(response: Response<Body>) -> Value {
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["code"], 0, "expected success envelope: {}", payload);
    assert_eq!(payload["message"], "success");
    payload["data"].clone()
}
