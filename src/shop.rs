//! The shop service: every caller-facing operation, grouped by concern in the submodules.
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod notifications;
pub mod orders;
pub mod reservations;

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use sea_orm::DatabaseTransaction;
use sea_orm::EntityTrait;
use sea_orm_migration::MigratorTrait;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::config::ShopConfig;
use crate::db::driver::DatabaseDriver;
use crate::db::migrations::Migrator;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::notify::DbSink;
use crate::notify::Notice;
use crate::notify::NotificationSink;
use crate::policy;
use crate::policy::Actor;
use crate::policy::Operation;

pub use cart::CartLine;
pub use cart::CartView;
pub use catalog::InventoryLogFilter;
pub use catalog::NewProduct;
pub use catalog::StockAdjustment;
pub use checkout::CheckoutRequest;
pub use checkout::PlacedOrder;
pub use customers::NewCustomer;
pub use orders::OrderDetails;
pub use reservations::NewReservation;
pub use reservations::PreOrderItem;
pub use reservations::ReservationDetails;
pub use reservations::ReservationReceipt;
pub use reservations::SkippedItem;

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Shop<D: DatabaseDriver> {
    driver: Arc<D>,
    config: ShopConfig,
    sink:   Arc<dyn NotificationSink>,
    clock:  Clock,
}

impl<D: DatabaseDriver> Debug for Shop<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("driver", &self.driver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D: DatabaseDriver> Shop<D> {
    /// A shop storing its notifications in its own database and reading "today" from the local calendar.
    pub fn new(driver: Arc<D>, config: ShopConfig) -> Self {
        let sink = Arc::new(DbSink::new(driver.connection()));
        Self {
            driver,
            config,
            sink,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    pub fn db(&self) -> DatabaseConnection {
        self.driver.connection()
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Tune the backend and bring the schema up to date.
    #[instrument(level = "debug", skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        self.driver.configure().await?;
        Migrator::up(&self.db(), None).await?;
        debug!("Schema is up to date on {}", self.driver.name());
        Ok(())
    }

    /// Resolve a user id into an [`Actor`]. Closed accounts can't act.
    pub async fn actor(&self, user_id: i32) -> Result<Actor> {
        let customer = self.customer_record(user_id).await?;
        let actor = Actor::new(customer.id, customer.role);
        self.ensure_active(&actor, &customer, Operation::SignIn)?;
        Ok(actor)
    }

    pub(crate) async fn customer_record(&self, user_id: i32) -> Result<Customer> {
        Customers::find_by_id(user_id)
            .one(&self.db())
            .await?
            .ok_or_else(|| ShopError::not_found("Customer", user_id))
    }

    fn ensure_active(&self, actor: &Actor, customer: &Customer, operation: Operation) -> Result<()> {
        if customer.is_active() {
            Ok(())
        }
        else {
            Err(ShopError::Permission {
                role: actor.role,
                operation,
            })
        }
    }

    /// Policy check plus a fresh look at the account; returns the caller's profile.
    pub(crate) async fn guard(&self, actor: &Actor, operation: Operation) -> Result<Customer> {
        policy::authorize(actor, operation)?;
        let customer = self.customer_record(actor.id).await?;
        self.ensure_active(actor, &customer, operation)?;
        Ok(customer)
    }

    /// Hand a notice to the sink. Failures are logged and swallowed.
    pub(crate) async fn notify(&self, notice: Notice) {
        if let Err(err) = self.sink.deliver(&notice).await {
            warn!(
                recipient = notice.recipient,
                kind = %notice.kind,
                "Notification not delivered: {err}"
            );
        }
    }

    pub(crate) async fn notify_admins<F>(&self, make_notice: F)
    where
        F: Fn(i32) -> Notice,
    {
        match self.admin_ids().await {
            Ok(admins) => {
                for admin in admins {
                    self.notify(make_notice(admin)).await;
                }
            }
            Err(err) => warn!("Can't list administrators to notify: {err}"),
        }
    }

    /// Run `attempt` until it succeeds, fails for a non-transient reason, or runs out of the configured attempts.
    pub(crate) async fn retry_transient<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.config.checkout_retries.max(1);
        let mut tried = 1;
        loop {
            match attempt().await {
                Err(err) if err.is_transient() && tried < attempts => {
                    debug!("{what}: attempt {tried} of {attempts} hit a conflict: {err}");
                    tokio::time::sleep(Duration::from_millis(5 * u64::from(tried))).await;
                    tried += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

/// Commit on success, roll back on failure. A failed rollback is logged; the operation error is returned.
pub(crate) async fn finish<T>(txn: DatabaseTransaction, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!("Rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}
