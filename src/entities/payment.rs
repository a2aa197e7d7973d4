use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single payment attempt against a wishlist item.
///
/// Many payments may reference the same item over time (a failed attempt
/// followed by a retry), but at most one of them is the item's
/// `current_payment` at any moment. `reference_id` is the client-supplied
/// idempotency token, unique when present; `transaction_id` arrives
/// asynchronously from the provider.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub wishlist_item_id: Option<Uuid>,

    /// Provider code: usdt, paypal or credit_card.
    pub provider: String,

    pub amount: Decimal,
    pub currency: String,

    /// created | pending | succeeded | failed | expired
    pub status: String,
    pub status_message: Option<String>,

    #[sea_orm(unique)]
    pub reference_id: Option<String>,

    pub transaction_id: Option<String>,

    pub payer_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wishlist_item::Entity",
        from = "Column::WishlistItemId",
        to = "super::wishlist_item::Column::Id"
    )]
    WishlistItem,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PayerId",
        to = "super::user::Column::Id"
    )]
    Payer,
}

impl Related<super::wishlist_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WishlistItem.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
