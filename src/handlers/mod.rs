use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::notifications::TelegramNotifier;
use crate::services::payments::PaymentService;
use crate::services::sites::SiteRegistry;
use crate::services::users::UserService;
use crate::services::wishlist::WishlistService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod common;
pub mod payment_webhooks;
pub mod payments;
pub mod sites;
pub mod telegram;
pub mod users;
pub mod wishlist;

/// Service container handed to every handler through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub payments: Arc<PaymentService>,
    pub wishlist: Arc<WishlistService>,
    pub users: Arc<UserService>,
    pub sites: Arc<SiteRegistry>,
    pub notifier: Arc<TelegramNotifier>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: EventSender,
    ) -> Self {
        Self {
            payments: Arc::new(PaymentService::new(
                db.clone(),
                config.payment.clone(),
                event_sender.clone(),
            )),
            wishlist: Arc::new(WishlistService::new(db.clone(), event_sender.clone())),
            users: Arc::new(UserService::new(db.clone())),
            sites: Arc::new(SiteRegistry::new(config.sites.clone())),
            notifier: Arc::new(TelegramNotifier::new(&config.telegram)),
        }
    }
}
