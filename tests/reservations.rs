#![cfg(feature = "sqlite")]

mod common;

use chrono::Days;
use chrono::NaiveTime;
use common::money;
use common::today;
use common::TestShop;
use musubi_orders::prelude::*;

fn dinner() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 30, 0).unwrap()
}

fn days_ahead(days: u64) -> chrono::NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

#[tokio::test]
async fn window_is_thirty_days() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;

    let receipt = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(30), dinner(), 2))
        .await
        .unwrap();
    assert_eq!(receipt.reservation.status, ReservationStatus::Pending);
    assert_eq!(receipt.reservation.reservation_date, days_ahead(30));

    let err = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(31), dinner(), 2))
        .await
        .unwrap_err();
    match err {
        ShopError::InvalidDate { date, earliest, latest } => {
            assert_eq!(date, days_ahead(31));
            assert_eq!(earliest, today());
            assert_eq!(latest, days_ahead(30));
        }
        other => panic!("unexpected error {other:?}"),
    }

    let yesterday = today().pred_opt().unwrap();
    let err = t
        .shop
        .create_reservation(&kai, NewReservation::new(yesterday, dinner(), 2))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidDate { .. }));

    t.shop
        .create_reservation(&kai, NewReservation::new(today(), dinner(), 1))
        .await
        .unwrap();
}

#[tokio::test]
async fn nobody_books_for_zero_guests() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;
    let err = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(3), dinner(), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn unavailable_pre_orders_are_skipped() {
    let t = TestShop::new().await;
    let plenty = t.product("Classic Spam Musubi", money(6500), 20).await;
    let scarce = t.product("Special Hawaiian Musubi", money(8500), 2).await;
    let kai = t.customer("kai").await;

    let request = NewReservation::new(days_ahead(7), dinner(), 4)
        .with_item(plenty.id, 4)
        .with_item(scarce.id, 3)
        .with_item(999, 1);
    let receipt = t.shop.create_reservation(&kai, request).await.unwrap();

    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].product_id, plenty.id);
    assert_eq!(receipt.items[0].price, money(6500));
    assert_eq!(receipt.total, money(26000));
    let skipped = receipt.skipped.iter().map(|s| s.product_id).collect::<Vec<_>>();
    assert_eq!(skipped, vec![scarce.id, 999]);

    // Reservations leave the stock alone.
    assert_eq!(t.stock_of(plenty.id).await, 20);
    assert_eq!(t.stock_of(scarce.id).await, 2);

    let details = t.shop.reservation(&kai, receipt.reservation.id).await.unwrap();
    assert_eq!(details.total(), money(26000));

    let inbox = t.shop.notifications(&t.admin).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::NewReservation);
    assert_eq!(inbox[0].reservation_id, Some(receipt.reservation.id));
}

#[tokio::test]
async fn customers_cancel_their_own_bookings() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;
    let lani = t.customer("lani").await;
    let receipt = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(2), dinner(), 2))
        .await
        .unwrap();
    let id = receipt.reservation.id;

    let err = t.shop.cancel_reservation(&lani, id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { .. }));

    let reservation = t.shop.cancel_reservation(&kai, id).await.unwrap();
    assert_eq!(reservation.status, ReservationStatus::Cancelled);

    let err = t.shop.cancel_reservation(&kai, id).await.unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
}

#[tokio::test]
async fn staff_confirm_and_complete() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;
    let host = t.staff("host").await;
    let receipt = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(5), dinner(), 6))
        .await
        .unwrap();
    let id = receipt.reservation.id;

    let reservation = t
        .shop
        .transition_reservation_status(&host, id, ReservationStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Confirmed);

    // Repeating the current status is silent.
    t.shop
        .transition_reservation_status(&host, id, ReservationStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(t.shop.notifications(&kai).await.unwrap().len(), 1);

    t.shop
        .transition_reservation_status(&host, id, ReservationStatus::Completed)
        .await
        .unwrap();
    let err = t
        .shop
        .transition_reservation_status(&host, id, ReservationStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));

    let inbox = t.shop.notifications(&kai).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().any(|n| n.kind == NotificationKind::ReservationCompleted));

    let err = t
        .shop
        .transition_reservation_status(&kai, id, ReservationStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Permission { .. }));
}

#[tokio::test]
async fn reservation_views_follow_roles() {
    let t = TestShop::new().await;
    let kai = t.customer("kai").await;
    let lani = t.customer("lani").await;
    let host = t.staff("host").await;
    let receipt = t
        .shop
        .create_reservation(&kai, NewReservation::new(days_ahead(4), dinner(), 3))
        .await
        .unwrap();
    let id = receipt.reservation.id;

    assert_eq!(t.shop.reservation(&kai, id).await.unwrap().reservation.id, id);
    assert_eq!(t.shop.reservation(&host, id).await.unwrap().reservation.id, id);

    let err = t.shop.reservation(&lani, id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound { entity: "Reservation", .. }));
    assert!(t.shop.customer_reservations(&lani).await.unwrap().is_empty());
    assert_eq!(t.shop.customer_reservations(&kai).await.unwrap().len(), 1);

    let err = t.shop.customer_reservations(&host).await.unwrap_err();
    assert!(matches!(
        err,
        ShopError::Permission {
            operation: Operation::ViewOwnReservations,
            ..
        }
    ));
}
