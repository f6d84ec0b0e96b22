//! # musubi-orders
//!
//! Order, inventory and reservation core for a small food-ordering shop.
//!
//! The crate owns the parts of the shop where money and stock change hands:
//!
//! - the product catalog and an append-only inventory audit trail;
//! - per-customer carts;
//! - the checkout calculator (subtotal, flat delivery fee, capped first-order discount);
//! - the transactional checkout that turns a cart into an order without ever overselling;
//! - the order status lifecycle and the notices customers get along the way;
//! - table reservations with optional pre-ordered dishes;
//! - a role-based authorization policy in front of all of the above.
//!
//! # Getting Started
//!
//! ```no_run
//! # async fn run() -> musubi_orders::error::Result<()> {
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use musubi_orders::prelude::*;
//!
//! let driver = Sqlite::open(Path::new("musubi.sqlite3")).await?;
//! let shop = Shop::new(Arc::new(driver), ShopConfig::default());
//! shop.migrate().await?;
//!
//! let customer = shop.register_customer(NewCustomer::new("kai", "kai@example.com")).await?;
//! let actor = shop.actor(customer.id).await?;
//! let summary = shop.compute_checkout_preview(&actor).await;
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```
//!
//! # Storage
//!
//! Persistence goes through SeaORM. The `sqlite` feature (on by default) and the `pg` feature each enable one
//! [`DatabaseDriver`](db::driver::DatabaseDriver) implementation. Checkouts take stock with a conditional update and
//! retry the whole transaction when the backend reports a lock conflict, so two customers racing for the last item
//! can't both get it.
//!
//! # Notifications
//!
//! Every state change a user cares about produces a [`Notice`](notify::Notice) handed to a
//! [`NotificationSink`](notify::NotificationSink) after the change is committed. The default sink stores notices in
//! the database where they form the users' inboxes. Sink failures are logged and otherwise ignored.
pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod policy;
pub mod pricing;
pub mod shop;
pub mod types;

#[doc(inline)]
pub use error::ShopError;
#[doc(inline)]
pub use shop::Shop;

pub mod prelude {
    pub use crate::config::ShopConfig;
    pub use crate::db::driver::DatabaseDriver;
    #[cfg(feature = "pg")]
    pub use crate::db::driver::pg::Pg;
    #[cfg(feature = "sqlite")]
    pub use crate::db::driver::sqlite::Sqlite;
    pub use crate::db::prelude::*;
    pub use crate::error::Result;
    pub use crate::error::ShopError;
    pub use crate::notify::Notice;
    pub use crate::notify::NotificationSink;
    pub use crate::policy::Actor;
    pub use crate::policy::Operation;
    pub use crate::pricing::CheckoutSummary;
    pub use crate::shop::CartLine;
    pub use crate::shop::CartView;
    pub use crate::shop::CheckoutRequest;
    pub use crate::shop::Clock;
    pub use crate::shop::InventoryLogFilter;
    pub use crate::shop::NewCustomer;
    pub use crate::shop::NewProduct;
    pub use crate::shop::NewReservation;
    pub use crate::shop::OrderDetails;
    pub use crate::shop::PlacedOrder;
    pub use crate::shop::PreOrderItem;
    pub use crate::shop::ReservationDetails;
    pub use crate::shop::ReservationReceipt;
    pub use crate::shop::Shop;
    pub use crate::shop::SkippedItem;
    pub use crate::shop::StockAdjustment;
    pub use crate::types::*;
}
