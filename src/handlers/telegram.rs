//! Telegram bot webhook.
//!
//! The only command handled is `/start <invite_code>`, which binds the chat
//! to the user owning the code so purchase notifications can reach them.
//! Telegram keeps retrying non-2xx responses, so update-level problems
//! (unknown command, unknown code) are logged and acknowledged anyway; only
//! structurally malformed requests get a 400.

use crate::{ApiResponse, AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

pub fn telegram_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(telegram_webhook))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
struct TelegramMessage {
    chat: TelegramChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
struct TelegramChat {
    id: i64,
}

/// Telegram update webhook
#[utoipa::path(
    post,
    path = "/api/v1/telegram/webhook",
    responses(
        (status = 200, description = "Update acknowledged", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Malformed update")
    ),
    tag = "telegram"
)]
pub async fn telegram_webhook(
    State(state): State<AppState>,
    payload: Result<Json<TelegramUpdate>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let Json(update) = match payload {
        Ok(update) => update,
        Err(rejection) => {
            warn!(%rejection, "malformed telegram update");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse {
                    code: 1,
                    message: "malformed telegram update".to_string(),
                    data: json!({}),
                }),
            );
        }
    };

    if let Some(message) = update.message {
        handle_message(&state, message).await;
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(json!({ "status": "ok" }))),
    )
}

async fn handle_message(state: &AppState, message: TelegramMessage) {
    let chat_id = message.chat.id.to_string();
    let Some(text) = message.text else { return };

    let Some(invite_code) = text.strip_prefix("/start ").map(str::trim) else {
        info!(chat_id, "ignoring telegram message without /start command");
        return;
    };
    if invite_code.is_empty() {
        info!(chat_id, "ignoring /start without invite code");
        return;
    }

    match state
        .services
        .users
        .bind_telegram_chat(invite_code, &chat_id)
        .await
    {
        Ok(user) => {
            info!(chat_id, user_id = user.id, "telegram chat bound via /start");
            let greeting = format!(
                "Hi {}! You will now receive purchase notifications here.",
                user.username
            );
            if let Err(e) = state.services.notifier.send_message(&chat_id, &greeting).await {
                warn!(chat_id, error = %e, "failed to send telegram greeting");
            }
        }
        Err(e) => {
            // Acknowledged regardless; Telegram would retry a non-2xx forever.
            warn!(chat_id, error = %e, "failed to bind telegram chat");
        }
    }
}
