use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::ConnectionTrait;
use sea_orm::EntityTrait;
use sea_orm::PaginatorTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::Set;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;

use super::cart::cart_lines;
use super::cart::cart_of;
use super::catalog::write_log;
use super::customers::non_blank;
use super::finish;
use super::OrderDetails;
use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::cart_item;
use crate::db::entity::order;
use crate::db::entity::order_item;
use crate::db::entity::product;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::notify::Notice;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::pricing::compute_checkout;
use crate::pricing::round_money;
use crate::pricing::CheckoutLine;
use crate::pricing::CheckoutSummary;
use crate::pricing::OrderHistory;
use crate::types::InventoryAction;
use crate::types::NotificationKind;
use crate::types::OrderStatus;
use crate::types::PaymentMethod;
use crate::types::PaymentStatus;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Falls back to the customer's profile address when missing or blank.
    pub delivery_address: Option<String>,
    pub notes:            Option<String>,
    #[serde(default)]
    pub payment_method:   PaymentMethod,
}

impl CheckoutRequest {
    pub fn deliver_to(address: &str) -> Self {
        Self {
            delivery_address: Some(address.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub details: OrderDetails,
    pub summary: CheckoutSummary,
}

/// Completed orders decide whether the first-order discount still applies.
async fn order_history<C: ConnectionTrait>(conn: &C, customer_id: i32) -> Result<OrderHistory> {
    let completed_orders = Orders::find()
        .filter(order::Column::CustomerId.eq(customer_id))
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .count(conn)
        .await?;
    Ok(OrderHistory { completed_orders })
}

impl<D: DatabaseDriver> Shop<D> {
    /// What the caller would pay for the current cart. Nothing is written.
    #[instrument(level = "debug", skip(self))]
    pub async fn compute_checkout_preview(&self, actor: &Actor) -> Result<CheckoutSummary> {
        self.guard(actor, Operation::Checkout).await?;

        let db = self.db();
        let cart = cart_lines(&db, actor.id).await?;
        let lines = cart.lines.iter().map(CheckoutLine::from).collect::<Vec<_>>();
        compute_checkout(&self.config, &lines, order_history(&db, actor.id).await?)
    }

    /// Turn the caller's cart into an order.
    ///
    /// Stock is taken, the order and its items are written, every line is logged as sold, and the cart is emptied in
    /// a single transaction. A line the stock can't cover aborts everything with
    /// [`ShopError::InsufficientStock`].
    #[instrument(level = "debug", skip(self, request))]
    pub async fn commit_checkout(&self, actor: &Actor, request: CheckoutRequest) -> Result<PlacedOrder> {
        let customer = self.guard(actor, Operation::Checkout).await?;

        let address = non_blank(request.delivery_address.clone())
            .or_else(|| non_blank(customer.address.clone()))
            .ok_or_else(|| ShopError::validation("A delivery address is required"))?;

        let placed = self
            .retry_transient("checkout", || self.try_checkout(actor, &address, &request))
            .await?;

        let order = &placed.details.order;
        info!(
            order_id = order.id,
            customer = actor.id,
            total = %order.total_amount,
            items = placed.details.items.len(),
            "Order placed"
        );

        let (order_id, total) = (order.id, order.total_amount);
        let username = customer.username;
        self.notify_admins(|admin| {
            Notice::for_order(
                admin,
                order_id,
                NotificationKind::NewOrder,
                "New Order Received".to_string(),
                format!("New order #{order_id} from {username}. Total: {total}"),
            )
        })
        .await;

        Ok(placed)
    }

    async fn try_checkout(&self, actor: &Actor, address: &str, request: &CheckoutRequest) -> Result<PlacedOrder> {
        let txn = self.db().begin().await?;
        let outcome: Result<PlacedOrder> = async {
            let cart = cart_of(&txn, actor.id, false).await?.ok_or(ShopError::EmptyCart)?;
            let items = CartItems::find()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .order_by_asc(cart_item::Column::Id)
                .all(&txn)
                .await?;
            if items.is_empty() {
                return Err(ShopError::EmptyCart);
            }

            let mut lines = Vec::with_capacity(items.len());
            let mut stock_moves = Vec::with_capacity(items.len());
            for item in &items {
                // Take the stock only if it is all there; the row lock keeps concurrent checkouts from overselling.
                let taken = Products::update_many()
                    .col_expr(
                        product::Column::Stock,
                        Expr::col(product::Column::Stock).sub(item.quantity),
                    )
                    .filter(product::Column::Id.eq(item.product_id))
                    .filter(product::Column::IsActive.eq(true))
                    .filter(product::Column::Stock.gte(item.quantity))
                    .exec(&txn)
                    .await?;

                let product = Products::find_by_id(item.product_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ShopError::not_found("Product", item.product_id))?;

                if taken.rows_affected == 0 {
                    if !product.is_active {
                        return Err(ShopError::not_found("Product", product.id));
                    }
                    return Err(ShopError::InsufficientStock {
                        product_id: product.id,
                        product:    product.name,
                        requested:  item.quantity,
                        available:  product.stock,
                    });
                }

                stock_moves.push((product.id, product.stock + item.quantity, product.stock));
                lines.push(CheckoutLine {
                    product_id: product.id,
                    name:       product.name,
                    quantity:   item.quantity,
                    unit_price: round_money(product.price),
                });
            }

            let summary = compute_checkout(&self.config, &lines, order_history(&txn, actor.id).await?)?;

            let now = Utc::now();
            let order = order::ActiveModel {
                customer_id: Set(actor.id),
                subtotal: Set(summary.subtotal),
                delivery_fee: Set(summary.delivery_fee),
                discount_amount: Set(summary.discount),
                discount_details: Set(summary.discount_reason.clone()),
                total_amount: Set(summary.grand_total),
                status: Set(OrderStatus::Pending),
                payment_method: Set(request.payment_method),
                payment_status: Set(PaymentStatus::Pending),
                delivery_address: Set(address.to_string()),
                notes: Set(non_blank(request.notes.clone())),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            let mut order_items = Vec::with_capacity(lines.len());
            for line in &lines {
                let item = order_item::ActiveModel {
                    order_id: Set(order.id),
                    product_id: Set(line.product_id),
                    quantity: Set(line.quantity),
                    price: Set(line.unit_price),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                order_items.push(item);
            }

            for (product_id, previous, new_stock) in stock_moves {
                write_log(
                    &txn,
                    product_id,
                    InventoryAction::Sold,
                    previous,
                    new_stock,
                    Some(format!("Order #{}", order.id)),
                    actor.id,
                )
                .await?;
            }

            CartItems::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;

            Ok(PlacedOrder {
                details: OrderDetails {
                    order,
                    items: order_items,
                },
                summary,
            })
        }
        .await;
        finish(txn, outcome).await
    }
}
