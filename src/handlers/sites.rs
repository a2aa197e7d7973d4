use crate::errors::ErrorResponse;
use crate::services::sites::{SiteConfigResponse, SiteStatistics, SiteSummary};
use crate::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};

pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sites))
        .route("/:site_id/config", get(get_site_config))
        .route("/:site_id/statistics", get(get_site_statistics))
}

/// List registered sites
#[utoipa::path(
    get,
    path = "/api/v1/sites",
    responses((status = 200, description = "All registered sites", body = crate::ApiResponse<Vec<crate::services::sites::SiteSummary>>)),
    tag = "sites"
)]
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Vec<SiteSummary>> {
    Ok(Json(ApiResponse::success(state.services.sites.list_sites())))
}

/// Storefront configuration for a site
#[utoipa::path(
    get,
    path = "/api/v1/sites/{site_id}/config",
    params(("site_id" = String, Path, description = "Site id")),
    responses(
        (status = 200, description = "Site configuration", body = crate::ApiResponse<crate::services::sites::SiteConfigResponse>),
        (status = 404, description = "Unknown site", body = ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn get_site_config(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<SiteConfigResponse> {
    let config = state.services.sites.get_config(&site_id)?;
    Ok(Json(ApiResponse::success(config)))
}

/// Dashboard statistics for a site
#[utoipa::path(
    get,
    path = "/api/v1/sites/{site_id}/statistics",
    params(("site_id" = String, Path, description = "Site id")),
    responses(
        (status = 200, description = "Site statistics", body = crate::ApiResponse<crate::services::sites::SiteStatistics>),
        (status = 404, description = "Unknown site", body = ErrorResponse)
    ),
    tag = "sites"
)]
pub async fn get_site_statistics(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> ApiResult<SiteStatistics> {
    let stats = state.services.sites.get_statistics(&site_id)?;
    Ok(Json(ApiResponse::success(stats)))
}
