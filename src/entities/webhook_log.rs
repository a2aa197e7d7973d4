use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit trail of provider events, kept for operator review.
///
/// Contradictory events (a terminal payment receiving a different terminal
/// status) are acknowledged to the provider but recorded here as
/// `rejected`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub event_type: String,

    #[sea_orm(column_type = "Json")]
    pub payload: Json,

    /// applied | duplicate | rejected | error
    pub outcome: String,
    pub detail: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
