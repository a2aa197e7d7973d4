use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_PAYMENT_EXPIRATION_MINUTES: i64 = 60;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Payment provider configuration.
///
/// Injected into the payment service at construction; provider credentials
/// are never read from ambient global state.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Minutes a created/pending payment may sit without provider
    /// confirmation before the expiry sweep transitions it to `expired`.
    #[serde(default = "default_payment_expiration_minutes")]
    #[validate(range(min = 1, max = 10080))]
    pub expiration_minutes: i64,

    /// Shared secret for verifying provider webhook signatures. When unset,
    /// webhooks are accepted unsigned (development only).
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Allowed clock skew for signed webhook timestamps.
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,

    #[serde(default)]
    pub usdt_wallet_address: Option<String>,

    #[serde(default)]
    pub paypal_client_id: Option<String>,

    #[serde(default)]
    pub paypal_secret: Option<String>,

    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    #[serde(default = "default_currency")]
    pub default_currency: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: default_payment_expiration_minutes(),
            webhook_secret: None,
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
            usdt_wallet_address: None,
            paypal_client_id: None,
            paypal_secret: None,
            stripe_secret_key: None,
            default_currency: default_currency(),
        }
    }
}

/// Telegram Bot API configuration for the notification relay.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token; notifications are disabled when unset.
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: default_telegram_api_base(),
        }
    }
}

/// Static per-site configuration entry.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteEntry {
    pub id: String,
    pub name: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_language")]
    pub default_language: String,
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Event channel capacity for the notification relay
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default)]
    #[validate]
    pub payment: PaymentConfig,

    #[serde(default)]
    #[validate]
    pub telegram: TelegramConfig,

    /// Static site registry; unknown site ids are refused with 404.
    #[serde(default = "default_sites")]
    pub sites: Vec<SiteEntry>,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("dev")
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_payment_expiration_minutes() -> i64 {
    DEFAULT_PAYMENT_EXPIRATION_MINUTES
}

fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_telegram_api_base() -> String {
    DEFAULT_TELEGRAM_API_BASE.to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_theme() -> String {
    "default".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_sites() -> Vec<SiteEntry> {
    vec![SiteEntry {
        id: "main".to_string(),
        name: "Main Mall".to_string(),
        theme: default_theme(),
        default_currency: default_currency(),
        default_language: default_language(),
    }]
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("wishmall_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://wishmall.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            environment: "development".into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            event_channel_capacity: default_event_channel_capacity(),
            payment: PaymentConfig::default(),
            telegram: TelegramConfig::default(),
            sites: default_sites(),
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_payment_expiration() {
        let mut cfg = base_config();
        cfg.payment.expiration_minutes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_site_registry_has_main_site() {
        let cfg = base_config();
        assert!(cfg.sites.iter().any(|s| s.id == "main"));
    }
}
