//! End-to-end coverage of the payment lifecycle and the wishlist/payment
//! linkage invariants.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::{spawn_app, TestApp};
use wishmall_api::entities::webhook_log;
use wishmall_api::errors::ServiceError;
use wishmall_api::services::payments::{
    InitiatePaymentRequest, PaymentProvider, PaymentStatus, ProviderEventOutcome,
};
use wishmall_api::services::wishlist::CreateWishlistItemRequest;

async fn seed_item(app: &TestApp, owner: &str) -> (i64, Uuid) {
    let owner = app.seed_user(owner).await;
    let product = app.seed_product("Mechanical Keyboard", Decimal::new(12900, 2)).await;
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
    (owner.id, item.id)
}

fn initiate_request(item_id: Uuid, payer_id: i64, reference: &str) -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        wishlist_item_id: item_id,
        provider: PaymentProvider::Usdt,
        reference_id: reference.to_string(),
        payer_id,
        amount: None,
    }
}

#[tokio::test]
async fn successful_payment_marks_item_purchased_and_keeps_pointer() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let payment = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-success"))
        .await
        .unwrap();
    assert_eq!(payment.status, "created");
    assert_eq!(payment.amount, Decimal::new(12900, 2));

    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.current_payment_id, Some(payment.id));

    let outcome = app
        .services
        .payments
        .record_provider_event("ref-success", PaymentStatus::Succeeded, Some("tx-1".into()))
        .await
        .unwrap();
    assert_eq!(outcome, ProviderEventOutcome::Applied);

    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.purchased_by_id, Some(buyer.id));
    assert!(item.purchased_at.is_some());
    // The winning payment stays linked as the historical record.
    assert_eq!(item.current_payment_id, Some(payment.id));

    let payment = app.services.payments.get_payment(payment.id).await.unwrap();
    assert_eq!(payment.status, "succeeded");
    assert_eq!(payment.transaction_id.as_deref(), Some("tx-1"));
    assert!(payment.completed_at.is_some());
}

#[tokio::test]
async fn failed_payment_releases_item_for_reinitiation() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let first = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-fail"))
        .await
        .unwrap();

    let outcome = app
        .services
        .payments
        .record_provider_event("ref-fail", PaymentStatus::Failed, None)
        .await
        .unwrap();
    assert_eq!(outcome, ProviderEventOutcome::Applied);

    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.current_payment_id, None);
    assert_eq!(item.purchased_by_id, None);

    // A fresh attempt with a new token succeeds.
    let second = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-fail-2"))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.current_payment_id, Some(second.id));
}

#[tokio::test]
async fn second_initiation_while_payment_active_conflicts() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;
    let other = app.seed_user("carol").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-first"))
        .await
        .unwrap();

    let err = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, other.id, "ref-second"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn concurrent_initiations_let_exactly_one_win() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;
    let other = app.seed_user("carol").await;

    let payments = app.services.payments.clone();
    let a = tokio::spawn({
        let payments = payments.clone();
        async move {
            payments
                .initiate_payment(initiate_request(item_id, buyer.id, "ref-race-a"))
                .await
        }
    });
    let b = tokio::spawn({
        let payments = payments.clone();
        async move {
            payments
                .initiate_payment(initiate_request(item_id, other.id, "ref-race-b"))
                .await
        }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one initiation must claim the item");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ServiceError::Conflict(_)))));
}

#[tokio::test]
async fn reference_id_replay_is_idempotent() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let first = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-idem"))
        .await
        .unwrap();
    let replay = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-idem"))
        .await
        .unwrap();
    assert_eq!(first.id, replay.id);
}

#[tokio::test]
async fn reference_id_reuse_for_different_item_conflicts() {
    let app = spawn_app().await;
    let (_owner_id, item_a) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let product = app.seed_product("Headphones", Decimal::new(4900, 2)).await;
    let item_b = app
        .services
        .wishlist
        .create_item(CreateWishlistItemRequest {
            owner_id: buyer.id,
            product_id: product.id,
            title: None,
        })
        .await
        .unwrap();

    app.services
        .payments
        .initiate_payment(initiate_request(item_a, buyer.id, "ref-shared"))
        .await
        .unwrap();
    let err = app
        .services
        .payments
        .initiate_payment(initiate_request(item_b.id, buyer.id, "ref-shared"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn duplicate_provider_event_is_absorbed() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-dup"))
        .await
        .unwrap();

    let first = app
        .services
        .payments
        .record_provider_event("ref-dup", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(first, ProviderEventOutcome::Applied);

    let second = app
        .services
        .payments
        .record_provider_event("ref-dup", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(second, ProviderEventOutcome::Duplicate);

    let logs = webhook_log::Entity::find()
        .filter(webhook_log::Column::Outcome.eq("duplicate"))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn terminal_payment_rejects_conflicting_status() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-terminal"))
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-terminal", PaymentStatus::Succeeded, None)
        .await
        .unwrap();

    // A contradictory late delivery is rejected but still acknowledged.
    let outcome = app
        .services
        .payments
        .record_provider_event("ref-terminal", PaymentStatus::Failed, None)
        .await
        .unwrap();
    assert_eq!(outcome, ProviderEventOutcome::Rejected);

    // Purchase state is untouched.
    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.purchased_by_id, Some(buyer.id));

    let logs = webhook_log::Entity::find()
        .filter(webhook_log::Column::Outcome.eq("rejected"))
        .all(app.db.as_ref())
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn purchaser_is_recorded_exactly_once() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-once"))
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-once", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    let item_before = app.services.wishlist.get_item(item_id).await.unwrap();

    // Replay does not move purchased_at or purchased_by.
    app.services
        .payments
        .record_provider_event("ref-once", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    let item_after = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item_before.purchased_by_id, item_after.purchased_by_id);
    assert_eq!(item_before.purchased_at, item_after.purchased_at);
}

#[tokio::test]
async fn sweep_expires_stale_payments_and_releases_items() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let payment = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-sweep"))
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-sweep", PaymentStatus::Pending, None)
        .await
        .unwrap();

    // Within the window: nothing to expire.
    let swept = app
        .services
        .payments
        .sweep_expired(Utc::now() + Duration::minutes(59))
        .await
        .unwrap();
    assert_eq!(swept, 0);

    // Past the window: the payment expires and the item is released.
    let swept = app
        .services
        .payments
        .sweep_expired(Utc::now() + Duration::minutes(61))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let payment = app.services.payments.get_payment(payment.id).await.unwrap();
    assert_eq!(payment.status, "expired");

    let item = app.services.wishlist.get_item(item_id).await.unwrap();
    assert_eq!(item.current_payment_id, None);

    // Expired is terminal: a late success is rejected.
    let outcome = app
        .services
        .payments
        .record_provider_event("ref-sweep", PaymentStatus::Succeeded, None)
        .await
        .unwrap();
    assert_eq!(outcome, ProviderEventOutcome::Rejected);
}

#[tokio::test]
async fn succeeded_payments_are_not_swept() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-done"))
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-done", PaymentStatus::Succeeded, None)
        .await
        .unwrap();

    let swept = app
        .services
        .payments
        .sweep_expired(Utc::now() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(swept, 0);
}

#[tokio::test]
async fn banned_payer_is_forbidden() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    app.services
        .users
        .ban_user(buyer.id, "chargeback abuse".into(), None)
        .await
        .unwrap();

    let err = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-banned"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(reason) if reason.contains("chargeback abuse"));
}

#[tokio::test]
async fn purchased_item_cannot_receive_new_payment() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;
    let other = app.seed_user("carol").await;

    app.services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "ref-buy"))
        .await
        .unwrap();
    app.services
        .payments
        .record_provider_event("ref-buy", PaymentStatus::Succeeded, None)
        .await
        .unwrap();

    let err = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, other.id, "ref-late"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let app = spawn_app().await;
    let err = app
        .services
        .payments
        .record_provider_event("no-such-ref", PaymentStatus::Succeeded, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn empty_reference_id_is_rejected() {
    let app = spawn_app().await;
    let (_owner_id, item_id) = seed_item(&app, "alice").await;
    let buyer = app.seed_user("bob").await;

    let err = app
        .services
        .payments
        .initiate_payment(initiate_request(item_id, buyer.id, "   "))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
