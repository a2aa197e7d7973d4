use crate::errors::ErrorResponse;
use crate::handlers::common::{Paginated, PaginationParams};
use crate::services::users::{RegisterUserRequest, UserResponse};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/:id", get(get_user))
        .route("/:id/invitees", get(list_invitees))
        .route("/:id/ban", post(ban_user))
        .route("/:id/unban", post(unban_user))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserBody {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    /// Invite code of the referring user.
    #[validate(length(min = 1, max = 32))]
    pub invite_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BanUserBody {
    /// Short reason shown back to the banned user.
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
    /// Ban end; permanent when omitted.
    pub until: Option<DateTime<Utc>>,
}

/// Register a user
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterUserBody,
    responses(
        (status = 200, description = "User registered", body = crate::ApiResponse<crate::services::users::UserResponse>),
        (status = 404, description = "Unknown invite code", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserBody>,
) -> ApiResult<UserResponse> {
    body.validate()?;
    let user = state
        .services
        .users
        .register(RegisterUserRequest {
            username: body.username,
            email: body.email,
            invite_code: body.invite_code,
        })
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = crate::ApiResponse<crate::services::users::UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<UserResponse> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Direct invitees of a user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/invitees",
    params(("id" = i64, Path, description = "User id"), PaginationParams),
    responses((status = 200, description = "One page of invitees", body = crate::ApiResponse<crate::handlers::common::Paginated<crate::services::users::UserResponse>>)),
    tag = "users"
)]
pub async fn list_invitees(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<UserResponse>> {
    let (users, total) = state
        .services
        .users
        .list_invitees(id, pagination.page(), pagination.page_size())
        .await?;

    Ok(Json(ApiResponse::success(Paginated::new(
        &format!("/api/v1/users/{}/invitees", id),
        pagination,
        total,
        users,
    ))))
}

/// Ban a user
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/ban",
    params(("id" = i64, Path, description = "User id")),
    request_body = BanUserBody,
    responses(
        (status = 200, description = "User banned", body = crate::ApiResponse<crate::services::users::UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn ban_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BanUserBody>,
) -> ApiResult<UserResponse> {
    body.validate()?;
    let user = state
        .services
        .users
        .ban_user(id, body.reason, body.until)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Lift a user's ban
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/unban",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Ban lifted", body = crate::ApiResponse<crate::services::users::UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn unban_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<UserResponse> {
    let user = state.services.users.unban_user(id).await?;
    Ok(Json(ApiResponse::success(user)))
}
