use crate::config::TelegramConfig;
use crate::errors::ServiceError;
use serde_json::json;
use tracing::{debug, info};

/// Thin client for the Telegram Bot API.
///
/// Delivery is best-effort: failures surface as `UpstreamUnavailable` for
/// the caller to log, never as a success state.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: Option<String>,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        if config.bot_token.is_none() {
            info!("Telegram bot token not configured; notifications disabled");
        }
        Self {
            http: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Sends a plain-text message to a chat. No-op when no token is set.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ServiceError> {
        let Some(token) = &self.bot_token else {
            debug!(chat_id, "telegram disabled; dropping notification");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| ServiceError::UpstreamUnavailable(format!("telegram: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::UpstreamUnavailable(format!(
                "telegram returned {}",
                response.status()
            )));
        }

        debug!(chat_id, "telegram notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramConfig;

    #[tokio::test]
    async fn disabled_notifier_is_a_noop() {
        let notifier = TelegramNotifier::new(&TelegramConfig::default());
        assert!(!notifier.is_enabled());
        // Without a token no network call is attempted, so this succeeds.
        notifier.send_message("42", "hello").await.unwrap();
    }
}
