use crate::config::PaymentConfig;
use crate::entities::{payment, user, webhook_log, wishlist_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Payment lifecycle: `created -> pending -> {succeeded, failed}`, with
/// `created`/`pending` expiring after the configured window. Terminal
/// states are absorbing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Pending,
    Succeeded,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Expired)
    }

    /// Whether a provider event may move a payment from `self` to `to`.
    /// Re-entering `created` is never valid; terminal states absorb.
    pub fn can_transition_to(self, to: PaymentStatus) -> bool {
        !self.is_terminal() && to != Self::Created && to != self
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentProvider {
    Usdt,
    Paypal,
    CreditCard,
}

/// How a provider event was absorbed. `Rejected` and `Duplicate` are still
/// acknowledged to the provider so it stops retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderEventOutcome {
    Applied,
    Duplicate,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct InitiatePaymentRequest {
    pub wishlist_item_id: Uuid,
    pub provider: PaymentProvider,
    /// Client-supplied idempotency token.
    pub reference_id: String,
    pub payer_id: i64,
    /// Defaults to the wishlist item's price.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub wishlist_item_id: Option<Uuid>,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub status_message: Option<String>,
    pub reference_id: Option<String>,
    pub transaction_id: Option<String>,
    pub payer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            wishlist_item_id: model.wishlist_item_id,
            provider: model.provider,
            amount: model.amount,
            currency: model.currency,
            status: model.status,
            status_message: model.status_message,
            reference_id: model.reference_id,
            transaction_id: model.transaction_id,
            payer_id: model.payer_id,
            created_at: model.created_at,
            completed_at: model.completed_at,
        }
    }
}

/// Maintains the wishlist/payment linkage invariants under concurrent
/// checkout attempts and out-of-order provider delivery.
///
/// Mutual exclusion is per wishlist item: the "no active payment" check and
/// the `current_payment_id` write happen as a compare-and-set inside one
/// transaction, so two concurrent initiations cannot both win.
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    config: PaymentConfig,
    event_sender: EventSender,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, config: PaymentConfig, event_sender: EventSender) -> Self {
        Self {
            db,
            config,
            event_sender,
        }
    }

    /// Creates a payment attempt for a wishlist item and marks it current.
    ///
    /// Fails with `NotFound` if the item is missing or already purchased,
    /// and with `Conflict` if another non-terminal payment is current or
    /// the idempotency token is reused for a different request. Replaying
    /// the identical request returns the original payment.
    pub async fn initiate_payment(
        &self,
        request: InitiatePaymentRequest,
    ) -> Result<PaymentResponse, ServiceError> {
        if request.reference_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "reference_id cannot be empty".to_string(),
            ));
        }

        // Idempotent replay: the same token for the same item and provider
        // returns the already-created payment instead of a duplicate.
        if let Some(existing) = payment::Entity::find()
            .filter(payment::Column::ReferenceId.eq(request.reference_id.clone()))
            .one(self.db.as_ref())
            .await?
        {
            if existing.wishlist_item_id == Some(request.wishlist_item_id)
                && existing.provider == request.provider.to_string()
            {
                return Ok(existing.into());
            }
            return Err(ServiceError::Conflict(format!(
                "reference_id '{}' already used",
                request.reference_id
            )));
        }

        let payer = user::Entity::find_by_id(request.payer_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", request.payer_id)))?;
        if payer.is_banned {
            return Err(ServiceError::Forbidden(
                payer.ban_reason.unwrap_or_else(|| "account banned".to_string()),
            ));
        }

        let txn = self.db.begin().await?;

        let item = wishlist_item::Entity::find_by_id(request.wishlist_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("wishlist item {}", request.wishlist_item_id))
            })?;

        if item.purchased_by_id.is_some() {
            return Err(ServiceError::NotFound(format!(
                "wishlist item {} is already purchased",
                item.id
            )));
        }
        if item.current_payment_id.is_some() {
            return Err(ServiceError::Conflict(format!(
                "wishlist item {} already has an active payment",
                item.id
            )));
        }

        let now = Utc::now();
        let amount = request.amount.unwrap_or(item.price);
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "amount must be positive".to_string(),
            ));
        }

        let inserted = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            wishlist_item_id: Set(Some(item.id)),
            provider: Set(request.provider.to_string()),
            amount: Set(amount),
            currency: Set(item.currency.clone()),
            status: Set(PaymentStatus::Created.to_string()),
            status_message: Set(None),
            reference_id: Set(Some(request.reference_id.clone())),
            transaction_id: Set(None),
            payer_id: Set(Some(request.payer_id)),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            // Unique index on reference_id backstops the pre-check under
            // concurrent retries.
            if ServiceError::is_unique_violation(&e) {
                ServiceError::Conflict(format!(
                    "reference_id '{}' already used",
                    request.reference_id
                ))
            } else {
                ServiceError::from(e)
            }
        })?;

        // Claim the item: only succeeds while no payment is current.
        let claimed = wishlist_item::Entity::update_many()
            .col_expr(
                wishlist_item::Column::CurrentPaymentId,
                Expr::value(Some(inserted.id)),
            )
            .filter(wishlist_item::Column::Id.eq(item.id))
            .filter(wishlist_item::Column::CurrentPaymentId.is_null())
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::Conflict(format!(
                "wishlist item {} already has an active payment",
                item.id
            )));
        }

        txn.commit().await?;

        info!(payment_id = %inserted.id, item_id = %item.id, provider = %inserted.provider, "payment initiated");
        self.event_sender
            .send(Event::PaymentCreated {
                payment_id: inserted.id,
                wishlist_item_id: item.id,
                provider: inserted.provider.clone(),
            })
            .await;

        Ok(inserted.into())
    }

    /// Absorbs a provider status event for the payment identified by its
    /// idempotency token.
    ///
    /// Duplicate delivery of the same status is a no-op; a terminal payment
    /// receiving a different terminal status is rejected and recorded in
    /// `webhook_logs` for operator review. Both still return `Ok` so the
    /// webhook handler can acknowledge the provider.
    pub async fn record_provider_event(
        &self,
        reference_id: &str,
        new_status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<ProviderEventOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let pay = payment::Entity::find()
            .filter(payment::Column::ReferenceId.eq(reference_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("payment with reference '{}'", reference_id))
            })?;

        let current = PaymentStatus::from_str(&pay.status).map_err(|_| {
            ServiceError::InternalError(format!("corrupt payment status '{}'", pay.status))
        })?;

        if new_status == current {
            self.log_webhook(&txn, reference_id, new_status, "duplicate", None)
                .await?;
            txn.commit().await?;
            return Ok(ProviderEventOutcome::Duplicate);
        }

        if !current.can_transition_to(new_status) {
            let detail = format!(
                "payment {} cannot move {} -> {}",
                pay.id, current, new_status
            );
            warn!(payment_id = %pay.id, %current, %new_status, "invalid provider transition");
            self.log_webhook(&txn, reference_id, new_status, "rejected", Some(detail))
                .await?;
            txn.commit().await?;
            return Ok(ProviderEventOutcome::Rejected);
        }

        let now = Utc::now();
        let mut update = payment::Entity::update_many()
            .col_expr(payment::Column::Status, Expr::value(new_status.to_string()))
            .col_expr(payment::Column::UpdatedAt, Expr::value(now))
            .filter(payment::Column::Id.eq(pay.id))
            .filter(payment::Column::Status.eq(current.to_string()));
        if let Some(tx_id) = &transaction_id {
            update = update.col_expr(
                payment::Column::TransactionId,
                Expr::value(Some(tx_id.clone())),
            );
        }
        if new_status == PaymentStatus::Succeeded {
            update = update.col_expr(payment::Column::CompletedAt, Expr::value(Some(now)));
        }

        let applied = update.exec(&txn).await?;
        if applied.rows_affected == 0 {
            // A concurrent delivery won the status race; treat as duplicate.
            self.log_webhook(
                &txn,
                reference_id,
                new_status,
                "duplicate",
                Some("concurrent delivery".to_string()),
            )
            .await?;
            txn.commit().await?;
            return Ok(ProviderEventOutcome::Duplicate);
        }

        let mut purchased = None;
        match new_status {
            PaymentStatus::Succeeded => {
                // The winning payment stays current as the historical
                // record; the purchaser is set exactly once.
                if let (Some(item_id), Some(payer_id)) = (pay.wishlist_item_id, pay.payer_id) {
                    let res = wishlist_item::Entity::update_many()
                        .col_expr(
                            wishlist_item::Column::PurchasedById,
                            Expr::value(Some(payer_id)),
                        )
                        .col_expr(wishlist_item::Column::PurchasedAt, Expr::value(Some(now)))
                        .filter(wishlist_item::Column::Id.eq(item_id))
                        .filter(wishlist_item::Column::PurchasedById.is_null())
                        .exec(&txn)
                        .await?;
                    if res.rows_affected > 0 {
                        purchased = Some((item_id, payer_id));
                    }
                }
            }
            PaymentStatus::Failed | PaymentStatus::Expired => {
                // Release the item so a new attempt may be initiated.
                if let Some(item_id) = pay.wishlist_item_id {
                    wishlist_item::Entity::update_many()
                        .col_expr(
                            wishlist_item::Column::CurrentPaymentId,
                            Expr::value(Option::<Uuid>::None),
                        )
                        .filter(wishlist_item::Column::Id.eq(item_id))
                        .filter(wishlist_item::Column::CurrentPaymentId.eq(pay.id))
                        .exec(&txn)
                        .await?;
                }
            }
            // can_transition_to rules out Created; Pending needs no linkage work.
            PaymentStatus::Pending | PaymentStatus::Created => {}
        }

        self.log_webhook(&txn, reference_id, new_status, "applied", None)
            .await?;
        txn.commit().await?;

        info!(payment_id = %pay.id, %current, %new_status, "provider event applied");
        self.event_sender
            .send(Event::PaymentStatusChanged {
                payment_id: pay.id,
                old_status: current.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        if let Some((item_id, payer_id)) = purchased {
            if let Some(item) = wishlist_item::Entity::find_by_id(item_id)
                .one(self.db.as_ref())
                .await?
            {
                self.event_sender
                    .send(Event::WishlistItemPurchased {
                        item_id,
                        owner_id: item.owner_id,
                        purchased_by_id: payer_id,
                        title: item.title,
                    })
                    .await;
            }
        }

        Ok(ProviderEventOutcome::Applied)
    }

    /// Expires `created`/`pending` payments that have sat past the
    /// configured window and releases their items. Called by an external
    /// scheduler; returns the number of payments expired.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let cutoff = now - Duration::minutes(self.config.expiration_minutes);
        let stale = payment::Entity::find()
            .filter(payment::Column::Status.is_in([
                PaymentStatus::Created.to_string(),
                PaymentStatus::Pending.to_string(),
            ]))
            .filter(payment::Column::UpdatedAt.lt(cutoff))
            .all(self.db.as_ref())
            .await?;

        let mut count = 0u64;
        for pay in stale {
            let txn = self.db.begin().await?;

            let expired = payment::Entity::update_many()
                .col_expr(
                    payment::Column::Status,
                    Expr::value(PaymentStatus::Expired.to_string()),
                )
                .col_expr(payment::Column::UpdatedAt, Expr::value(now))
                .col_expr(
                    payment::Column::StatusMessage,
                    Expr::value(Some("expired by sweep".to_string())),
                )
                .filter(payment::Column::Id.eq(pay.id))
                .filter(payment::Column::Status.eq(pay.status.clone()))
                .exec(&txn)
                .await?;
            if expired.rows_affected == 0 {
                // A provider event landed between the scan and the sweep.
                txn.rollback().await?;
                continue;
            }

            if let Some(item_id) = pay.wishlist_item_id {
                wishlist_item::Entity::update_many()
                    .col_expr(
                        wishlist_item::Column::CurrentPaymentId,
                        Expr::value(Option::<Uuid>::None),
                    )
                    .filter(wishlist_item::Column::Id.eq(item_id))
                    .filter(wishlist_item::Column::CurrentPaymentId.eq(pay.id))
                    .exec(&txn)
                    .await?;
            }

            txn.commit().await?;
            count += 1;

            info!(payment_id = %pay.id, "payment expired by sweep");
            self.event_sender
                .send(Event::PaymentExpired {
                    payment_id: pay.id,
                    wishlist_item_id: pay.wishlist_item_id,
                })
                .await;
        }

        Ok(count)
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ServiceError> {
        let pay = payment::Entity::find_by_id(payment_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment {}", payment_id)))?;
        Ok(pay.into())
    }

    pub async fn get_item_payments(
        &self,
        wishlist_item_id: Uuid,
    ) -> Result<Vec<PaymentResponse>, ServiceError> {
        let payments = payment::Entity::find()
            .filter(payment::Column::WishlistItemId.eq(wishlist_item_id))
            .order_by_desc(payment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        Ok(payments.into_iter().map(Into::into).collect())
    }

    /// Returns one page of payments plus the total row count.
    pub async fn list_payments(
        &self,
        page: u64,
        page_size: u64,
        status: Option<PaymentStatus>,
    ) -> Result<(Vec<PaymentResponse>, u64), ServiceError> {
        let mut query = payment::Entity::find().order_by_desc(payment::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(payment::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(self.db.as_ref(), page_size.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    async fn log_webhook<C: ConnectionTrait>(
        &self,
        conn: &C,
        reference_id: &str,
        status: PaymentStatus,
        outcome: &str,
        detail: Option<String>,
    ) -> Result<(), ServiceError> {
        webhook_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            event_type: Set(format!("payment.{}", status)),
            payload: Set(json!({ "reference_id": reference_id, "status": status.to_string() })),
            outcome: Set(outcome.to_string()),
            detail: Set(detail),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
        Ok(())
    }
}
