use crate::errors::ErrorResponse;
use crate::handlers::common::{Paginated, PaginationParams};
use crate::services::wishlist::{CreateWishlistItemRequest, WishlistItemResponse};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item).get(list_items))
        .route("/items/:id", get(get_item).delete(remove_item))
        .route("/items/:id/view", post(record_view))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWishlistItemBody {
    pub owner_id: i64,
    pub product_id: Uuid,
    /// Custom title; defaults to the product name.
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WishlistListParams {
    /// Restrict to one owner's wishlist.
    pub owner_id: Option<i64>,
    /// Only items that can currently receive a payment: not purchased and
    /// with no active payment attempt.
    #[serde(default)]
    pub payable: bool,
}

/// Save a product to a wishlist
#[utoipa::path(
    post,
    path = "/api/v1/wishlist/items",
    request_body = CreateWishlistItemBody,
    responses(
        (status = 200, description = "Item saved", body = crate::ApiResponse<crate::services::wishlist::WishlistItemResponse>),
        (status = 404, description = "Owner or product not found", body = ErrorResponse)
    ),
    tag = "wishlist"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(body): Json<CreateWishlistItemBody>,
) -> ApiResult<WishlistItemResponse> {
    body.validate()?;
    let item = state
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: body.owner_id,
            product_id: body.product_id,
            title: body.title,
        })
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Get a wishlist item
#[utoipa::path(
    get,
    path = "/api/v1/wishlist/items/{id}",
    params(("id" = Uuid, Path, description = "Wishlist item id")),
    responses(
        (status = 200, description = "Item found", body = crate::ApiResponse<crate::services::wishlist::WishlistItemResponse>),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    tag = "wishlist"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WishlistItemResponse> {
    let item = state.services.wishlist.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// List wishlist items
#[utoipa::path(
    get,
    path = "/api/v1/wishlist/items",
    params(PaginationParams, WishlistListParams),
    responses((status = 200, description = "One page of wishlist items", body = crate::ApiResponse<crate::handlers::common::Paginated<crate::services::wishlist::WishlistItemResponse>>)),
    tag = "wishlist"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<WishlistListParams>,
) -> ApiResult<Paginated<WishlistItemResponse>> {
    let (items, total) = state
        .services
        .wishlist
        .list_items(
            filter.owner_id,
            filter.payable,
            pagination.page(),
            pagination.page_size(),
        )
        .await?;

    Ok(Json(ApiResponse::success(Paginated::new(
        "/api/v1/wishlist/items",
        pagination,
        total,
        items,
    ))))
}

/// Record a view of a wishlist item
#[utoipa::path(
    post,
    path = "/api/v1/wishlist/items/{id}/view",
    params(("id" = Uuid, Path, description = "Wishlist item id")),
    responses(
        (status = 200, description = "View recorded", body = crate::ApiResponse<crate::services::wishlist::WishlistItemResponse>),
        (status = 404, description = "Item not found", body = ErrorResponse)
    ),
    tag = "wishlist"
)]
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<WishlistItemResponse> {
    let item = state.services.wishlist.record_view(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// Remove a wishlist item
///
/// Purchased items and items with an in-flight payment are kept as records
/// and cannot be removed.
#[utoipa::path(
    delete,
    path = "/api/v1/wishlist/items/{id}",
    params(("id" = Uuid, Path, description = "Wishlist item id")),
    responses(
        (status = 200, description = "Item removed", body = crate::ApiResponse<serde_json::Value>),
        (status = 409, description = "Item is purchased or has an active payment", body = ErrorResponse)
    ),
    tag = "wishlist"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.wishlist.remove_item(id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({}))))
}
