use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::user;
use crate::services::notifications::TelegramNotifier;

/// Events emitted by the services layer. Delivery is fire-and-forget; a
/// dropped event never fails the request that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PaymentCreated {
        payment_id: Uuid,
        wishlist_item_id: Uuid,
        provider: String,
    },
    PaymentStatusChanged {
        payment_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentExpired {
        payment_id: Uuid,
        wishlist_item_id: Option<Uuid>,
    },
    WishlistItemPurchased {
        item_id: Uuid,
        owner_id: i64,
        purchased_by_id: i64,
        title: String,
    },
    WishlistItemViewed {
        item_id: Uuid,
        view_count: i64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging (never propagating) channel failures.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            error!("Failed to publish event: {}", e);
        }
    }
}

/// Builds an event channel with the configured capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events and relays user-facing ones to Telegram.
///
/// Runs until the channel closes. Notification failures are logged and
/// swallowed; the relay carries no state machine.
pub async fn process_events(
    mut receiver: mpsc::Receiver<Event>,
    db: Arc<DbPool>,
    notifier: Arc<TelegramNotifier>,
) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::WishlistItemPurchased {
                owner_id, title, ..
            } => {
                let chat_id = match user::Entity::find_by_id(*owner_id).one(db.as_ref()).await {
                    Ok(Some(owner)) => owner.telegram_chat_id,
                    Ok(None) => None,
                    Err(e) => {
                        error!(owner_id, "failed to load owner for notification: {}", e);
                        None
                    }
                };
                if let Some(chat_id) = chat_id {
                    let text = format!("Your wishlist item \"{}\" was just purchased!", title);
                    if let Err(e) = notifier.send_message(&chat_id, &text).await {
                        error!(owner_id, "telegram delivery failed: {}", e);
                    }
                }
            }
            other => {
                debug!(?other, "event observed");
            }
        }
    }
    info!("Event processor stopped");
}
