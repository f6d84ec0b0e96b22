#![cfg(feature = "sqlite")]

mod common;

use common::money;
use common::TestShop;
use musubi_orders::prelude::*;

async fn placed_order(t: &TestShop) -> (Actor, Order, Product) {
    let a = t.product("Classic Spam Musubi", money(6500), 10).await;
    let kai = t.customer("kai").await;
    let placed = t.order(&kai, &[(a.id, 2)]).await.unwrap();
    (kai, placed.details.order, a)
}

async fn kinds(t: &TestShop, actor: &Actor) -> Vec<NotificationKind> {
    let mut kinds = t
        .shop
        .notifications(actor)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind.to_string())
        .collect::<Vec<_>>();
    kinds.sort();
    kinds.into_iter().map(|k| k.parse().unwrap()).collect()
}

#[tokio::test]
async fn each_change_notifies_once() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;

    let order = t
        .shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(kinds(&t, &kai).await, vec![NotificationKind::OrderPreparing]);

    // Same status again is a no-op.
    t.shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(kinds(&t, &kai).await.len(), 1);

    t.shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Shipping)
        .await
        .unwrap();
    let inbox = t.shop.notifications(&kai).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().all(|n| n.order_id == Some(order.id)));
    assert_eq!(t.shop.unread_notification_count(&kai).await.unwrap(), 2);

    assert_eq!(t.shop.mark_all_notifications_read(&kai).await.unwrap(), 2);
    assert_eq!(t.shop.unread_notification_count(&kai).await.unwrap(), 0);
}

#[tokio::test]
async fn orders_never_move_backwards() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;

    t.shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Shipping)
        .await
        .unwrap();
    let err = t
        .shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    t.shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Completed)
        .await
        .unwrap();
    let err = t
        .shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    assert_eq!(
        kinds(&t, &kai).await,
        vec![NotificationKind::OrderCompleted, NotificationKind::OrderShipping]
    );
}

#[tokio::test]
async fn completing_cash_on_delivery_marks_paid() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;
    assert_eq!(order.payment_method, PaymentMethod::Cod);

    let order = t
        .shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let details = t.shop.order(&kai, order.id).await.unwrap();
    assert_eq!(details.order.status, OrderStatus::Completed);
    assert_eq!(details.items.len(), 1);
}

#[tokio::test]
async fn cancelling_does_not_restock() {
    let t = TestShop::new().await;
    let (kai, order, product) = placed_order(&t).await;
    assert_eq!(t.stock_of(product.id).await, 8);

    t.shop
        .transition_order_status(&t.admin, order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(t.stock_of(product.id).await, 8);
    assert_eq!(kinds(&t, &kai).await, vec![NotificationKind::OrderCancelled]);
}

#[tokio::test]
async fn accepting_clears_the_new_order_alert() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;
    assert_eq!(t.shop.unread_notification_count(&t.admin).await.unwrap(), 1);

    let order = t.shop.accept_order(&t.admin, order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(t.shop.unread_notification_count(&t.admin).await.unwrap(), 0);
    assert_eq!(kinds(&t, &kai).await, vec![NotificationKind::OrderPreparing]);

    let err = t.shop.accept_order(&t.admin, order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn staff_move_orders_customers_do_not() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;
    let cook = t.staff("cook").await;

    let err = t
        .shop
        .transition_order_status(&kai, order.id, OrderStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Permission { .. }));

    let order = t
        .shop
        .transition_order_status(&cook, order.id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(t.shop.all_orders(&cook, Some(OrderStatus::Preparing)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let t = TestShop::new().await;
    let (kai, order, _) = placed_order(&t).await;
    let lani = t.customer("lani").await;

    assert_eq!(t.shop.order(&kai, order.id).await.unwrap().order.id, order.id);
    let err = t.shop.order(&lani, order.id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { entity: "Order", .. }));
    assert!(t.shop.customer_orders(&lani).await.unwrap().is_empty());

    let err = t.shop.mark_notification_read(&lani, 1).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { .. }));
}

#[tokio::test]
async fn missing_orders_are_reported() {
    let t = TestShop::new().await;
    let err = t
        .shop
        .transition_order_status(&t.admin, 404, OrderStatus::Shipping)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::NotFound { entity: "Order", id: 404 }));
}
