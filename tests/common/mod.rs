#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use musubi_orders::prelude::*;
use rust_decimal::Decimal;
use tempfile::TempDir;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub struct TestShop {
    pub shop:  Arc<Shop<Sqlite>>,
    pub admin: Actor,
    // Keeps the database directory alive for the duration of the test.
    _dir:      TempDir,
}

impl TestShop {
    pub async fn new() -> Self {
        Self::with(|shop| shop).await
    }

    /// Build a shop on a fresh database, letting the caller swap sinks or tweak the setup.
    pub async fn with<F>(customize: F) -> Self
    where
        F: FnOnce(Shop<Sqlite>) -> Shop<Sqlite>,
    {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let driver = Sqlite::connect(dir.path(), "shop.db")
            .await
            .expect("Failed to open test database");
        let shop = Shop::new(Arc::new(driver), ShopConfig::default()).with_clock(today);
        let shop = customize(shop);
        shop.migrate().await.expect("Failed to migrate");

        let admin = shop
            .create_admin(NewCustomer::new("admin", "admin@musubi.local"))
            .await
            .expect("Failed to create admin");
        let admin = shop.actor(admin.id).await.expect("Admin can't act");

        Self {
            shop: Arc::new(shop),
            admin,
            _dir: dir,
        }
    }

    pub async fn customer(&self, username: &str) -> Actor {
        let customer = self
            .shop
            .register_customer(
                NewCustomer::new(username, &format!("{username}@example.com"))
                    .with_address("7 Banawe St., Quezon City"),
            )
            .await
            .expect("Failed to register customer");
        self.shop.actor(customer.id).await.expect("Customer can't act")
    }

    pub async fn staff(&self, username: &str) -> Actor {
        let staff = self
            .shop
            .create_staff(&self.admin, NewCustomer::new(username, &format!("{username}@musubi.local")))
            .await
            .expect("Failed to create staff");
        self.shop.actor(staff.id).await.expect("Staff can't act")
    }

    pub async fn product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        self.shop
            .create_product(
                &self.admin,
                NewProduct {
                    name: name.to_string(),
                    description: format!("{name}, made to order"),
                    price,
                    bundle_price: None,
                    stock,
                    category: ProductCategory::Spam,
                },
            )
            .await
            .expect("Failed to create product")
    }

    pub async fn stock_of(&self, product_id: i32) -> i32 {
        self.shop.product(product_id).await.expect("Product is gone").stock
    }

    /// Fill the cart and check out to the profile address.
    pub async fn order(&self, customer: &Actor, lines: &[(i32, i32)]) -> Result<PlacedOrder> {
        for &(product_id, quantity) in lines {
            self.shop.add_to_cart(customer, product_id, quantity).await?;
        }
        self.shop.commit_checkout(customer, CheckoutRequest::default()).await
    }
}
