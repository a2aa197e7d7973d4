mod common;

use assert_matches::assert_matches;
use common::spawn_app;
use rust_decimal::Decimal;
use wishmall_api::errors::ServiceError;
use wishmall_api::services::payments::{InitiatePaymentRequest, PaymentProvider, PaymentStatus};
use wishmall_api::services::wishlist::CreateWishlistItemRequest;

#[tokio::test]
async fn create_item_denormalizes_catalog_data() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let product = app.seed_product("Espresso Machine", Decimal::new(24999, 2)).await;

    let item = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id: product.id,
            title: None,
        })
        .await
        .unwrap();

    assert_eq!(item.title, "Espresso Machine");
    assert_eq!(item.price, Decimal::new(24999, 2));
    assert_eq!(item.currency, "USD");
    assert_eq!(item.view_count, 0);
    assert!(item.current_payment_id.is_none());
    assert!(item.purchased_by_id.is_none());
}

#[tokio::test]
async fn custom_title_overrides_product_name() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let product = app.seed_product("Espresso Machine", Decimal::new(24999, 2)).await;

    let item = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id: product.id,
            title: Some("My dream machine".into()),
        })
        .await
        .unwrap();
    assert_eq!(item.title, "My dream machine");
}

#[tokio::test]
async fn view_counter_only_grows() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let product = app.seed_product("Lamp", Decimal::new(1999, 2)).await;
    let item = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id: product.id,
            title: None,
        })
        .await
        .unwrap();

    let viewed = app.services.wishlist.record_view(item.id).await.unwrap();
    assert_eq!(viewed.view_count, 1);
    assert!(viewed.last_viewed_at.is_some());

    let viewed = app.services.wishlist.record_view(item.id).await.unwrap();
    assert_eq!(viewed.view_count, 2);
}

#[tokio::test]
async fn payable_filter_excludes_claimed_and_purchased_items() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let buyer = app.seed_user("bob").await;

    let mut items = Vec::new();
    for name in ["One", "Two", "Three"] {
        let product = app.seed_product(name, Decimal::new(1000, 2)).await;
        let item = app
            .services
            .wishlist
            .create_item(CreateWishlistItemRequest {
                owner_id: owner.id,
                product_id: product.id,
                title: None,
            })
            .await
            .unwrap();
        items.push(item);
    }

    // Claim the first, purchase the second.
    app.services
        .payments
        .initiate_payment(InitiatePaymentRequest {
            wishlist_item_id: items[0].id,
            provider: PaymentProvider::Paypal,
            reference_id: "ref-claimed".into(),
            payer_id: buyer.id,
            amount: None,
        })
        .await
        .unwrap();
    app.services
        .payments
        .initiate_payment(InitiatePaymentRequest {
            wishlist_item_id: items[1].id,
            provider: PaymentProvider::Paypal,
            reference_id: "ref-bought".into(),
            payer_id: buyer.id,
            amount: None,
        })
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-bought", PaymentStatus::Succeeded, None)
        .await
        .unwrap();

    let (all, total) = app
        .services
        .wishlist
        .list_items(Some(owner.id), false, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(all.len(), 3);

    let (payable, total) = app
        .services
        .wishlist
        .list_items(Some(owner.id), true, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(payable[0].id, items[2].id);
}

#[tokio::test]
async fn purchased_and_claimed_items_cannot_be_removed() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let buyer = app.seed_user("bob").await;
    let product = app.seed_product("Chair", Decimal::new(8900, 2)).await;
    let item = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id: product.id,
            title: None,
        })
        .await
        .unwrap();

    app.services
        .payments
        .initiate_payment(InitiatePaymentRequest {
            wishlist_item_id: item.id,
            provider: PaymentProvider::Usdt,
            reference_id: "ref-rm".into(),
            payer_id: buyer.id,
            amount: None,
        })
        .await
        .unwrap();
    let err = app.services.wishlist.remove_item(item.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    app.services
        .payments
        .record_provider_event("ref-rm", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    let err = app.services.wishlist.remove_item(item.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn unclaimed_item_can_be_removed() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let product = app.seed_product("Mug", Decimal::new(900, 2)).await;
    let item = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id: product.id,
            title: None,
        })
        .await
        .unwrap();

    app.services.wishlist.remove_item(item.id).await.unwrap();
    let err = app.services.wishlist.get_item(item.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn inactive_product_cannot_be_wished() {
    let app = spawn_app().await;
    let owner = app.seed_user("alice").await;
    let product = app.seed_product("Retired", Decimal::new(100, 2)).await;
    let product_id = product.id;

    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
    let mut active = product.into_active_model();
    active.is_active = Set(false);
    active.update(app.db.as_ref()).await.unwrap();

    let err = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: owner.id,
            product_id,
            title: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
