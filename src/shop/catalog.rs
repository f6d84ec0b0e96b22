use chrono::Utc;
use garde::Validate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::ConnectionTrait;
use sea_orm::EntityTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::Set;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::finish;
use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::inventory_log;
use crate::db::entity::product;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::pricing::non_negative;
use crate::pricing::non_negative_opt;
use crate::pricing::round_money;
use crate::types::InventoryAction;
use crate::types::ProductCategory;

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct NewProduct {
    #[garde(length(min = 1, max = 200))]
    pub name:         String,
    #[garde(skip)]
    pub description:  String,
    #[garde(custom(non_negative))]
    pub price:        Decimal,
    #[garde(skip)]
    pub bundle_price: Option<Decimal>,
    #[garde(range(min = 0))]
    pub stock:        i32,
    #[garde(skip)]
    pub category:     ProductCategory,
}

/// A manual stock correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustment {
    /// Goods received.
    StockIn(i32),
    /// Goods written off. Stock bottoms out at zero.
    StockOut(i32),
    /// Stock counted and set to an absolute value.
    Set(i32),
}

impl StockAdjustment {
    fn amount(self) -> i32 {
        match self {
            Self::StockIn(n) | Self::StockOut(n) | Self::Set(n) => n,
        }
    }

    fn action(self) -> InventoryAction {
        match self {
            Self::StockIn(_) => InventoryAction::StockIn,
            Self::StockOut(_) => InventoryAction::StockOut,
            Self::Set(_) => InventoryAction::Adjustment,
        }
    }

    fn apply(self, current: i32) -> i32 {
        match self {
            Self::StockIn(n) => current.saturating_add(n),
            Self::StockOut(n) => (current - n).max(0),
            Self::Set(n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct InventoryLogFilter {
    pub product_id: Option<i32>,
    pub action:     Option<InventoryAction>,
}

impl<D: DatabaseDriver> Shop<D> {
    #[instrument(level = "debug", skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, admin: &Actor, new: NewProduct) -> Result<Product> {
        self.guard(admin, Operation::ManageProducts).await?;
        new.validate()?;
        non_negative_opt(&new.bundle_price, &()).map_err(ShopError::validation)?;

        let txn = self.db().begin().await?;
        let outcome: Result<Product> = async {
            let now = Utc::now();
            let product = product::ActiveModel {
                name: Set(new.name.trim().to_string()),
                description: Set(new.description.clone()),
                price: Set(round_money(new.price)),
                bundle_price: Set(new.bundle_price.map(round_money)),
                stock: Set(new.stock),
                category: Set(new.category),
                is_active: Set(true),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            if product.stock > 0 {
                write_log(
                    &txn,
                    product.id,
                    InventoryAction::StockIn,
                    0,
                    product.stock,
                    Some("Initial stock".to_string()),
                    admin.id,
                )
                .await?;
            }

            Ok(product)
        }
        .await;
        let product = finish(txn, outcome).await?;

        info!(id = product.id, stock = product.stock, "Product '{}' created", product.name);
        Ok(product)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn update_product_price(&self, admin: &Actor, product_id: i32, price: Decimal) -> Result<Product> {
        self.guard(admin, Operation::ManageProducts).await?;
        non_negative(&price, &()).map_err(ShopError::validation)?;

        let mut am: product::ActiveModel = self.product(product_id).await?.into();
        am.price = Set(round_money(price));
        Ok(am.update(&self.db()).await?)
    }

    /// Retire or bring back a product. Products are never physically deleted; orders keep pointing at them.
    #[instrument(level = "debug", skip(self))]
    pub async fn set_product_active(&self, admin: &Actor, product_id: i32, active: bool) -> Result<Product> {
        self.guard(admin, Operation::ManageProducts).await?;

        let mut am: product::ActiveModel = self.product(product_id).await?.into();
        am.is_active = Set(active);
        let product = am.update(&self.db()).await?;
        info!(id = product_id, active, "Product availability changed");
        Ok(product)
    }

    /// Catalog reads are public and take no actor.
    pub async fn product(&self, product_id: i32) -> Result<Product> {
        Products::find_by_id(product_id)
            .one(&self.db())
            .await?
            .ok_or_else(|| ShopError::not_found("Product", product_id))
    }

    pub async fn active_products(&self) -> Result<Vec<Product>> {
        Ok(Products::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Category)
            .order_by_asc(product::Column::Name)
            .all(&self.db())
            .await?)
    }

    pub async fn all_products(&self) -> Result<Vec<Product>> {
        Ok(Products::find()
            .order_by_asc(product::Column::Id)
            .all(&self.db())
            .await?)
    }

    /// Active products with some stock left, but no more than the configured threshold.
    pub async fn low_stock_products(&self) -> Result<Vec<Product>> {
        Ok(Products::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.gt(0))
            .filter(product::Column::Stock.lte(self.config.low_stock_threshold))
            .order_by_asc(product::Column::Stock)
            .all(&self.db())
            .await?)
    }

    pub async fn out_of_stock_products(&self) -> Result<Vec<Product>> {
        Ok(Products::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.lte(0))
            .order_by_asc(product::Column::Name)
            .all(&self.db())
            .await?)
    }

    #[instrument(level = "debug", skip(self, notes))]
    pub async fn adjust_stock(
        &self,
        admin: &Actor,
        product_id: i32,
        adjustment: StockAdjustment,
        notes: Option<String>,
    ) -> Result<InventoryLog> {
        self.guard(admin, Operation::ManageInventory).await?;
        if adjustment.amount() < 0 {
            return Err(ShopError::validation("Stock adjustment amount must not be negative"));
        }

        let log = self
            .retry_transient("stock adjustment", || {
                self.try_adjust_stock(admin, product_id, adjustment, notes.clone())
            })
            .await?;

        info!(
            product_id,
            action = %log.action,
            previous = log.previous_stock,
            new = log.new_stock,
            "Stock adjusted"
        );
        Ok(log)
    }

    async fn try_adjust_stock(
        &self,
        admin: &Actor,
        product_id: i32,
        adjustment: StockAdjustment,
        notes: Option<String>,
    ) -> Result<InventoryLog> {
        let txn = self.db().begin().await?;
        let outcome: Result<InventoryLog> = async {
            let product = Products::find_by_id(product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ShopError::not_found("Product", product_id))?;

            let previous = product.stock;
            let new_stock = adjustment.apply(previous);

            // Compare-and-set so a checkout committing in between is not overwritten.
            let updated = Products::update_many()
                .col_expr(product::Column::Stock, Expr::value(new_stock))
                .filter(product::Column::Id.eq(product_id))
                .filter(product::Column::Stock.eq(previous))
                .exec(&txn)
                .await?;
            if updated.rows_affected == 0 {
                return Err(ShopError::Conflict(format!("product #{product_id} stock")));
            }

            write_log(
                &txn,
                product_id,
                adjustment.action(),
                previous,
                new_stock,
                notes,
                admin.id,
            )
            .await
        }
        .await;
        finish(txn, outcome).await
    }

    /// Audit rows, newest first.
    #[instrument(level = "debug", skip(self))]
    pub async fn inventory_logs(&self, admin: &Actor, filter: InventoryLogFilter) -> Result<Vec<InventoryLog>> {
        self.guard(admin, Operation::ManageInventory).await?;

        let mut query = InventoryLogs::find();
        if let Some(product_id) = filter.product_id {
            query = query.filter(inventory_log::Column::ProductId.eq(product_id));
        }
        if let Some(action) = filter.action {
            query = query.filter(inventory_log::Column::Action.eq(action));
        }

        Ok(query
            .order_by_desc(inventory_log::Column::CreatedAt)
            .order_by_desc(inventory_log::Column::Id)
            .all(&self.db())
            .await?)
    }

    /// Drop an audit row. The stock change it recorded stays in effect.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_inventory_log(&self, admin: &Actor, log_id: i32) -> Result<InventoryLog> {
        self.guard(admin, Operation::ManageInventory).await?;

        let db = self.db();
        let log = InventoryLogs::find_by_id(log_id)
            .one(&db)
            .await?
            .ok_or_else(|| ShopError::not_found("Inventory log", log_id))?;
        InventoryLogs::delete_by_id(log_id).exec(&db).await?;

        warn!(
            log_id,
            product_id = log.product_id,
            quantity = log.quantity,
            "Inventory log deleted; product stock is not reverted"
        );
        Ok(log)
    }
}

/// Append an audit row for a stock change from `previous` to `new_stock`.
pub(crate) async fn write_log<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    action: InventoryAction,
    previous: i32,
    new_stock: i32,
    notes: Option<String>,
    created_by: i32,
) -> Result<InventoryLog> {
    Ok(inventory_log::ActiveModel {
        product_id: Set(product_id),
        action: Set(action),
        quantity: Set(new_stock - previous),
        previous_stock: Set(previous),
        new_stock: Set(new_stock),
        notes: Set(notes),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}
