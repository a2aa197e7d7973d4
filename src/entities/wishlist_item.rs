use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product saved to a user's wishlist.
///
/// `current_payment_id` holds the single active payment attempt for the
/// item; it is null when no attempt is in flight and keeps pointing at the
/// winning payment after a successful purchase. `purchased_by_id` is set
/// exactly once, by the success transition, and is never cleared.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishlist_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: i64,

    #[sea_orm(column_type = "Uuid")]
    pub product_id: Uuid,

    /// Denormalized from the product at save time so the wish survives
    /// catalog edits.
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PurchasedById",
        to = "super::user::Column::Id"
    )]
    Purchaser,

    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,

    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
