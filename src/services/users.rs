use crate::entities::user;
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub email: String,
    /// Invite code of the referring user, if any.
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub invite_code: String,
    pub invited_by: Option<i64>,
    pub level: i32,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_until: Option<DateTime<Utc>>,
    pub telegram_connected: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            invite_code: model.invite_code,
            invited_by: model.invited_by,
            level: model.level,
            is_banned: model.is_banned,
            ban_reason: model.ban_reason,
            ban_until: model.ban_until,
            telegram_connected: model.telegram_chat_id.is_some(),
            created_at: model.created_at,
        }
    }
}

pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Registers a user, wiring them into the invitation graph when an
    /// invite code is supplied. Each user gets a fresh unique invite code;
    /// their level is one below their inviter's.
    pub async fn register(
        &self,
        request: RegisterUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        let inviter = match &request.invite_code {
            Some(code) => Some(
                user::Entity::find()
                    .filter(user::Column::InviteCode.eq(code.clone()))
                    .one(self.db.as_ref())
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("invite code '{}'", code))
                    })?,
            ),
            None => None,
        };

        let invite_code = self.generate_invite_code().await?;
        let now = Utc::now();

        let inserted = user::ActiveModel {
            username: Set(request.username.clone()),
            email: Set(request.email),
            invite_code: Set(invite_code),
            invited_by: Set(inviter.as_ref().map(|u| u.id)),
            level: Set(inviter.as_ref().map(|u| u.level + 1).unwrap_or(0)),
            is_banned: Set(false),
            ban_reason: Set(None),
            ban_until: Set(None),
            ban_count: Set(0),
            telegram_chat_id: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| {
            if ServiceError::is_unique_violation(&e) {
                ServiceError::Conflict(format!("username '{}' is taken", request.username))
            } else {
                ServiceError::from(e)
            }
        })?;

        info!(user_id = inserted.id, username = %inserted.username, "user registered");
        Ok(inserted.into())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<UserResponse, ServiceError> {
        let found = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;
        Ok(found.into())
    }

    /// Direct invitees of a user, newest first.
    pub async fn list_invitees(
        &self,
        user_id: i64,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<UserResponse>, u64), ServiceError> {
        let paginator = user::Entity::find()
            .filter(user::Column::InvitedBy.eq(user_id))
            .order_by_desc(user::Column::CreatedAt)
            .paginate(self.db.as_ref(), page_size.max(1));
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users.into_iter().map(Into::into).collect(), total))
    }

    /// Bans a user. Only the short operator-supplied reason is ever shown
    /// back to them.
    pub async fn ban_user(
        &self,
        user_id: i64,
        reason: String,
        until: Option<DateTime<Utc>>,
    ) -> Result<UserResponse, ServiceError> {
        let found = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        let ban_count = found.ban_count + 1;
        let mut active: user::ActiveModel = found.into();
        active.is_banned = Set(true);
        active.ban_reason = Set(Some(reason));
        active.ban_until = Set(until);
        active.ban_count = Set(ban_count);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(self.db.as_ref()).await?;
        info!(user_id = updated.id, "user banned");
        Ok(updated.into())
    }

    pub async fn unban_user(&self, user_id: i64) -> Result<UserResponse, ServiceError> {
        let found = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user {}", user_id)))?;

        let mut active: user::ActiveModel = found.into();
        active.is_banned = Set(false);
        active.ban_reason = Set(None);
        active.ban_until = Set(None);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(self.db.as_ref()).await?;
        info!(user_id = updated.id, "user unbanned");
        Ok(updated.into())
    }

    /// Binds a Telegram chat to the user owning the given invite code.
    /// Used by the bot's `/start <invite_code>` flow.
    pub async fn bind_telegram_chat(
        &self,
        invite_code: &str,
        chat_id: &str,
    ) -> Result<UserResponse, ServiceError> {
        let found = user::Entity::find()
            .filter(user::Column::InviteCode.eq(invite_code))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("invite code '{}'", invite_code)))?;

        let mut active: user::ActiveModel = found.into();
        active.telegram_chat_id = Set(Some(chat_id.to_string()));
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(self.db.as_ref()).await?;
        info!(user_id = updated.id, "telegram chat bound");
        Ok(updated.into())
    }

    async fn generate_invite_code(&self) -> Result<String, ServiceError> {
        loop {
            let code: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(INVITE_CODE_LEN)
                .map(char::from)
                .collect::<String>()
                .to_uppercase();

            let exists = user::Entity::find()
                .filter(user::Column::InviteCode.eq(code.clone()))
                .one(self.db.as_ref())
                .await?
                .is_some();
            if !exists {
                return Ok(code);
            }
        }
    }
}
