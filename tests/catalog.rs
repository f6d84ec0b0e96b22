#![cfg(feature = "sqlite")]

mod common;

use common::money;
use common::TestShop;
use musubi_orders::prelude::*;

async fn logs_for(t: &TestShop, product_id: i32) -> Vec<InventoryLog> {
    t.shop
        .inventory_logs(
            &t.admin,
            InventoryLogFilter {
                product_id: Some(product_id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn initial_stock_is_logged() {
    let t = TestShop::new().await;
    let stocked = t.product("Classic Spam Musubi", money(6500), 50).await;
    let empty = t.product("Teriyaki Chicken Musubi", money(7500), 0).await;

    let logs = logs_for(&t, stocked.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, InventoryAction::StockIn);
    assert_eq!((logs[0].previous_stock, logs[0].quantity, logs[0].new_stock), (0, 50, 50));

    assert!(logs_for(&t, empty.id).await.is_empty());
}

#[tokio::test]
async fn adjustments_keep_the_ledger_consistent() {
    let t = TestShop::new().await;
    let p = t.product("Vegetarian Tofu Musubi", money(7000), 10).await;

    let log = t
        .shop
        .adjust_stock(&t.admin, p.id, StockAdjustment::StockIn(15), Some("Morning batch".to_string()))
        .await
        .unwrap();
    assert_eq!((log.previous_stock, log.quantity, log.new_stock), (10, 15, 25));

    let log = t
        .shop
        .adjust_stock(&t.admin, p.id, StockAdjustment::StockOut(30), None)
        .await
        .unwrap();
    assert_eq!(log.action, InventoryAction::StockOut);
    assert_eq!((log.previous_stock, log.quantity, log.new_stock), (25, -25, 0));

    let log = t
        .shop
        .adjust_stock(&t.admin, p.id, StockAdjustment::Set(7), Some("Recount".to_string()))
        .await
        .unwrap();
    assert_eq!(log.action, InventoryAction::Adjustment);
    assert_eq!((log.previous_stock, log.quantity, log.new_stock), (0, 7, 7));
    assert_eq!(t.stock_of(p.id).await, 7);

    for log in logs_for(&t, p.id).await {
        assert_eq!(log.new_stock, log.previous_stock + log.quantity);
        assert!(log.new_stock >= 0);
    }

    let err = t
        .shop
        .adjust_stock(&t.admin, p.id, StockAdjustment::StockIn(-3), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn deleting_a_log_keeps_the_stock() {
    let t = TestShop::new().await;
    let p = t.product("Special Hawaiian Musubi", money(8500), 5).await;
    let log = t
        .shop
        .adjust_stock(&t.admin, p.id, StockAdjustment::StockIn(10), None)
        .await
        .unwrap();

    let deleted = t.shop.delete_inventory_log(&t.admin, log.id).await.unwrap();
    assert_eq!(deleted.id, log.id);
    assert_eq!(t.stock_of(p.id).await, 15);
    assert_eq!(logs_for(&t, p.id).await.len(), 1);

    let err = t.shop.delete_inventory_log(&t.admin, log.id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { .. }));
}

#[tokio::test]
async fn stock_levels_are_classified() {
    let t = TestShop::new().await;
    let plenty = t.product("Classic Spam Musubi", money(6500), 50).await;
    let low = t.product("Teriyaki Chicken Musubi", money(7500), 10).await;
    let none = t.product("Vegetarian Tofu Musubi", money(7000), 0).await;

    let low_ids = t.shop.low_stock_products().await.unwrap().into_iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(low_ids, vec![low.id]);
    let out_ids = t.shop.out_of_stock_products().await.unwrap().into_iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(out_ids, vec![none.id]);

    t.shop.set_product_active(&t.admin, plenty.id, false).await.unwrap();
    let active = t.shop.active_products().await.unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|p| p.id != plenty.id));
}

#[tokio::test]
async fn catalog_checks_input_and_roles() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;
    let cook = t.staff("cook").await;

    let bad = NewProduct {
        name: "Ghost Musubi".to_string(),
        description: String::new(),
        price: money(-100),
        bundle_price: None,
        stock: 1,
        category: ProductCategory::Special,
    };
    let err = t.shop.create_product(&t.admin, bad.clone()).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let err = t.shop.create_product(&kai, bad.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::Permission {
            role: Role::Customer,
            operation: Operation::ManageProducts
        }
    ));

    let p = t.product("Classic Spam Musubi", money(6500), 5).await;
    let err = t
        .shop
        .adjust_stock(&cook, p.id, StockAdjustment::Set(0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Permission { role: Role::Staff, .. }));

    let err = t.shop.update_product_price(&t.admin, p.id, money(-1)).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
    let p = t.shop.update_product_price(&t.admin, p.id, money(7000)).await.unwrap();
    assert_eq!(p.price, money(7000));
}
