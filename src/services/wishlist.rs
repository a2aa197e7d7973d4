use crate::entities::{product, user, wishlist_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateWishlistItemRequest {
    pub owner_id: i64,
    pub product_id: Uuid,
    /// Defaults to the product name.
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WishlistItemResponse {
    pub id: Uuid,
    pub owner_id: i64,
    pub product_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
    pub current_payment_id: Option<Uuid>,
    pub purchased_by_id: Option<i64>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
}

impl From<wishlist_item::Model> for WishlistItemResponse {
    fn from(model: wishlist_item::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            product_id: model.product_id,
            title: model.title,
            price: model.price,
            currency: model.currency,
            current_payment_id: model.current_payment_id,
            purchased_by_id: model.purchased_by_id,
            purchased_at: model.purchased_at,
            view_count: model.view_count,
            last_viewed_at: model.last_viewed_at,
            added_at: model.added_at,
        }
    }
}

pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Saves a product to a user's wishlist. Price and currency are
    /// denormalized from the catalog at save time; view counters start at
    /// zero and are never touched on creation.
    pub async fn create_item(
        &self,
        request: CreateWishlistItemRequest,
    ) -> Result<WishlistItemResponse, ServiceError> {
        let owner = user::Entity::find_by_id(request.owner_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", request.owner_id)))?;
        if owner.is_banned {
            return Err(ServiceError::Forbidden(
                owner.ban_reason.unwrap_or_else(|| "account banned".to_string()),
            ));
        }

        let product = product::Entity::find_by_id(request.product_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", request.product_id)))?;
        if !product.is_active {
            return Err(ServiceError::ValidationError(format!(
                "product {} is not available",
                product.id
            )));
        }

        let item = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner.id),
            product_id: Set(product.id),
            title: Set(request.title.unwrap_or_else(|| product.name.clone())),
            price: Set(product.price),
            currency: Set(product.currency.clone()),
            current_payment_id: Set(None),
            purchased_by_id: Set(None),
            purchased_at: Set(None),
            view_count: Set(0),
            last_viewed_at: Set(None),
            added_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await?;

        info!(item_id = %item.id, owner_id = owner.id, "wishlist item created");
        Ok(item.into())
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<WishlistItemResponse, ServiceError> {
        let item = wishlist_item::Entity::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("wishlist item {}", item_id)))?;
        Ok(item.into())
    }

    /// Lists wishlist items, optionally scoped to an owner. With
    /// `payable_only` the result excludes purchased items and items with an
    /// active payment attempt.
    pub async fn list_items(
        &self,
        owner_id: Option<i64>,
        payable_only: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<WishlistItemResponse>, u64), ServiceError> {
        let mut query =
            wishlist_item::Entity::find().order_by_desc(wishlist_item::Column::AddedAt);
        if let Some(owner_id) = owner_id {
            query = query.filter(wishlist_item::Column::OwnerId.eq(owner_id));
        }
        if payable_only {
            query = query
                .filter(wishlist_item::Column::PurchasedById.is_null())
                .filter(wishlist_item::Column::CurrentPaymentId.is_null());
        }

        let paginator = query.paginate(self.db.as_ref(), page_size.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items.into_iter().map(Into::into).collect(), total))
    }

    /// Records a view event: bumps `view_count` and refreshes
    /// `last_viewed_at`. The counter only ever grows.
    pub async fn record_view(&self, item_id: Uuid) -> Result<WishlistItemResponse, ServiceError> {
        let now = Utc::now();
        let updated = wishlist_item::Entity::update_many()
            .col_expr(
                wishlist_item::Column::ViewCount,
                Expr::col(wishlist_item::Column::ViewCount).add(1),
            )
            .col_expr(wishlist_item::Column::LastViewedAt, Expr::value(Some(now)))
            .filter(wishlist_item::Column::Id.eq(item_id))
            .exec(self.db.as_ref())
            .await?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("wishlist item {}", item_id)));
        }

        let item = wishlist_item::Entity::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("wishlist item {}", item_id)))?;

        self.event_sender
            .send(Event::WishlistItemViewed {
                item_id,
                view_count: item.view_count,
            })
            .await;

        Ok(item.into())
    }

    /// Removes an item. Purchased items and items with an in-flight payment
    /// are kept as records and cannot be removed.
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let item = wishlist_item::Entity::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("wishlist item {}", item_id)))?;

        if item.purchased_by_id.is_some() {
            return Err(ServiceError::Conflict(
                "purchased items cannot be removed".to_string(),
            ));
        }
        if item.current_payment_id.is_some() {
            return Err(ServiceError::Conflict(
                "items with an active payment cannot be removed".to_string(),
            ));
        }

        item.delete(self.db.as_ref()).await?;
        Ok(())
    }
}
