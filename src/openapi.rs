use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wishmall API",
        version = "1.0.0",
        description = r#"
# Wishmall Multi-Site Wishlist API

Backend for multi-site wishlist e-commerce: users save catalog products to
wishlists, other users purchase them, and payment providers confirm the
result asynchronously via webhooks.

## Response Envelope

Every endpoint wraps its payload in a uniform envelope:

```json
{
  "code": 0,
  "message": "success",
  "data": { }
}
```

`code` is 0 on success and 1 on failure; the HTTP status carries the error
category.

## Pagination

List endpoints accept `page` (1-based) and `page_size` (default 20, max 100)
and return `count`, `next`, `previous`, `page`, `page_size`, `pages` and
`results`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "wishlist", description = "Wishlist item management"),
        (name = "payments", description = "Payment lifecycle and provider webhooks"),
        (name = "users", description = "Registration, invitation graph and bans"),
        (name = "sites", description = "Site registry"),
        (name = "telegram", description = "Telegram bot webhook")
    ),
    paths(
        // Wishlist
        crate::handlers::wishlist::create_item,
        crate::handlers::wishlist::get_item,
        crate::handlers::wishlist::list_items,
        crate::handlers::wishlist::record_view,
        crate::handlers::wishlist::remove_item,

        // Payments
        crate::handlers::payments::initiate_payment,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::get_item_payments,
        crate::handlers::payments::sweep_expired,
        crate::handlers::payment_webhooks::provider_webhook,

        // Users
        crate::handlers::users::register_user,
        crate::handlers::users::get_user,
        crate::handlers::users::list_invitees,
        crate::handlers::users::ban_user,
        crate::handlers::users::unban_user,

        // Sites
        crate::handlers::sites::list_sites,
        crate::handlers::sites::get_site_config,
        crate::handlers::sites::get_site_statistics,

        // Telegram
        crate::handlers::telegram::telegram_webhook,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            // Wishlist types
            crate::handlers::wishlist::CreateWishlistItemBody,
            crate::services::wishlist::WishlistItemResponse,

            // Payment types
            crate::handlers::payments::InitiatePaymentBody,
            crate::services::payments::PaymentResponse,
            crate::services::payments::PaymentStatus,
            crate::services::payments::PaymentProvider,
            crate::services::payments::ProviderEventOutcome,

            // User types
            crate::handlers::users::RegisterUserBody,
            crate::handlers::users::BanUserBody,
            crate::services::users::UserResponse,

            // Site types
            crate::services::sites::SiteSummary,
            crate::services::sites::SiteConfigResponse,
            crate::services::sites::SiteStatistics,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Wishmall API"));
        assert!(json.contains("/api/v1/payments"));
        assert!(json.contains("/api/v1/wishlist/items"));
    }
}
