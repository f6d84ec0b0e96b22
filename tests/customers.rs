#![cfg(feature = "sqlite")]

mod common;

use common::money;
use common::TestShop;
use musubi_orders::prelude::*;

#[tokio::test]
async fn usernames_are_unique_and_checked() {
    let t = TestShop::new().await;
    t.customer("kai").await;

    let err = t
        .shop
        .register_customer(NewCustomer::new("kai", "other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let err = t
        .shop
        .register_customer(NewCustomer::new("k", "k@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let err = t
        .shop
        .register_customer(NewCustomer::new("lani", "not-an-address"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn deactivated_customers_keep_their_history() {
    let t = TestShop::new().await;
    let p = t.product("Classic Spam Musubi", money(6500), 10).await;
    let kai = t.customer("kai").await;
    let placed = t.order(&kai, &[(p.id, 1)]).await.unwrap();
    t.shop.add_to_cart(&kai, p.id, 3).await.unwrap();

    let closed = t.shop.deactivate_customer(&t.admin, kai.id).await.unwrap();
    assert!(!closed.is_active());

    let err = t.shop.actor(kai.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Permission { .. }));
    // A handle obtained before the account was closed stops working too.
    let err = t.shop.cart(&kai).await.unwrap_err();
    assert!(matches!(err, ShopError::Permission { .. }));

    let details = t.shop.order(&t.admin, placed.details.order.id).await.unwrap();
    assert_eq!(details.order.customer_id, kai.id);
    assert_eq!(details.items.len(), 1);
}

#[tokio::test]
async fn profile_address_feeds_checkout() {
    let t = TestShop::new().await;
    let p = t.product("Classic Spam Musubi", money(6500), 10).await;
    let kai = t.customer("kai").await;

    let profile = t.shop.update_address(&kai, "88 Maginhawa St.").await.unwrap();
    assert_eq!(profile.address.as_deref(), Some("88 Maginhawa St."));

    let placed = t.order(&kai, &[(p.id, 1)]).await.unwrap();
    assert_eq!(placed.details.order.delivery_address, "88 Maginhawa St.");
}

#[tokio::test]
async fn admins_are_listed_for_alerts() {
    let t = TestShop::new().await;
    t.customer("kai").await;
    t.staff("cook").await;
    assert_eq!(t.shop.admin_ids().await.unwrap(), vec![t.admin.id]);
}
