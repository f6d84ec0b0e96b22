use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::ConnectionTrait;
use sea_orm::EntityTrait;
use sea_orm::JoinType;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::QuerySelect;
use sea_orm::RelationTrait;
use sea_orm::Set;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;

use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::cart;
use crate::db::entity::cart_item;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::pricing::round_money;
use crate::pricing::CheckoutLine;

/// A cart line priced at the product's current price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub item_id:    i32,
    pub product_id: i32,
    pub name:       String,
    pub quantity:   i32,
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

impl From<&CartLine> for CheckoutLine {
    fn from(line: &CartLine) -> Self {
        CheckoutLine {
            product_id: line.product_id,
            name:       line.name.clone(),
            quantity:   line.quantity,
            unit_price: line.unit_price,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
}

impl CartView {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }
}

impl<D: DatabaseDriver> Shop<D> {
    /// Put `quantity` units of a product into the caller's cart. The cart is created on first use.
    ///
    /// Only availability is checked here; whether the stock covers the quantity is decided at checkout.
    #[instrument(level = "debug", skip(self))]
    pub async fn add_to_cart(&self, actor: &Actor, product_id: i32, quantity: i32) -> Result<CartItem> {
        self.guard(actor, Operation::ManageCart).await?;
        if quantity < 1 {
            return Err(ShopError::validation("Quantity must be at least 1"));
        }

        let db = self.db();
        let product = Products::find_by_id(product_id)
            .one(&db)
            .await?
            .filter(|p| p.is_active && p.in_stock())
            .ok_or_else(|| ShopError::not_found("Product", product_id))?;

        let cart = cart_of(&db, actor.id, true)
            .await?
            .ok_or_else(|| ShopError::not_found("Cart", actor.id))?;

        let existing = CartItems::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(&db)
            .await?;

        let item = match existing {
            Some(item) => {
                let quantity = item
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| ShopError::validation("Quantity is too large"))?;
                let mut am: cart_item::ActiveModel = item.into();
                am.quantity = Set(quantity);
                am.update(&db).await?
            }
            None => {
                cart_item::ActiveModel {
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    quantity: Set(quantity),
                    ..Default::default()
                }
                .insert(&db)
                .await?
            }
        };
        touch(&db, cart).await?;

        debug!(cart_item = item.id, quantity = item.quantity, "Added '{}' to cart", product.name);
        Ok(item)
    }

    /// Overwrite a line's quantity. Zero or less removes the line and yields `None`.
    #[instrument(level = "debug", skip(self))]
    pub async fn update_cart_item(&self, actor: &Actor, item_id: i32, quantity: i32) -> Result<Option<CartItem>> {
        self.guard(actor, Operation::ManageCart).await?;

        let db = self.db();
        let item = own_item(&db, actor.id, item_id).await?;
        if quantity <= 0 {
            CartItems::delete_by_id(item.id).exec(&db).await?;
            return Ok(None);
        }

        let mut am: cart_item::ActiveModel = item.into();
        am.quantity = Set(quantity);
        Ok(Some(am.update(&db).await?))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn remove_cart_item(&self, actor: &Actor, item_id: i32) -> Result<()> {
        self.guard(actor, Operation::ManageCart).await?;

        let db = self.db();
        let item = own_item(&db, actor.id, item_id).await?;
        CartItems::delete_by_id(item.id).exec(&db).await?;
        Ok(())
    }

    /// Empty the caller's cart; returns the number of lines removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn clear_cart(&self, actor: &Actor) -> Result<u64> {
        self.guard(actor, Operation::ManageCart).await?;

        let db = self.db();
        let Some(cart) = cart_of(&db, actor.id, false).await?
        else {
            return Ok(0);
        };
        let res = CartItems::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn cart(&self, actor: &Actor) -> Result<CartView> {
        self.guard(actor, Operation::ManageCart).await?;
        cart_lines(&self.db(), actor.id).await
    }

    /// Sum of the live prices of everything in the cart.
    pub async fn cart_total(&self, actor: &Actor) -> Result<Decimal> {
        Ok(self.cart(actor).await?.total())
    }
}

/// The customer's cart, created on demand when `create` is set.
pub(crate) async fn cart_of<C: ConnectionTrait>(conn: &C, customer_id: i32, create: bool) -> Result<Option<Cart>> {
    let cart = Carts::find()
        .filter(cart::Column::CustomerId.eq(customer_id))
        .one(conn)
        .await?;
    if cart.is_some() || !create {
        return Ok(cart);
    }

    let now = Utc::now();
    let cart = cart::ActiveModel {
        customer_id: Set(customer_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(Some(cart))
}

pub(crate) async fn cart_lines<C: ConnectionTrait>(conn: &C, customer_id: i32) -> Result<CartView> {
    let Some(cart) = cart_of(conn, customer_id, false).await?
    else {
        return Ok(CartView::default());
    };

    let lines = CartItems::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .order_by_asc(cart_item::Column::Id)
        .find_also_related(Products)
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|p| CartLine {
                item_id:    item.id,
                product_id: p.id,
                name:       p.name,
                quantity:   item.quantity,
                unit_price: round_money(p.price),
            })
        })
        .collect();

    Ok(CartView { lines })
}

async fn own_item<C: ConnectionTrait>(conn: &C, customer_id: i32, item_id: i32) -> Result<CartItem> {
    CartItems::find_by_id(item_id)
        .join(JoinType::InnerJoin, cart_item::Relation::Cart.def())
        .filter(cart::Column::CustomerId.eq(customer_id))
        .one(conn)
        .await?
        .ok_or_else(|| ShopError::not_found("Cart item", item_id))
}

async fn touch<C: ConnectionTrait>(conn: &C, cart: Cart) -> Result<()> {
    let mut am: cart::ActiveModel = cart.into();
    am.updated_at = Set(Utc::now());
    am.update(conn).await?;
    Ok(())
}
