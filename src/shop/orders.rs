use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::EntityTrait;
use sea_orm::ModelTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::Set;
use serde::Serialize;
use tracing::info;
use tracing::instrument;

use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::notification;
use crate::db::entity::order;
use crate::db::entity::order_item;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::notify::Notice;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::types::NotificationKind;
use crate::types::OrderStatus;
use crate::types::PaymentMethod;
use crate::types::PaymentStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetails {
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::total).sum()
    }
}

fn status_notice(order: &Order) -> Option<Notice> {
    let kind = order.status.notification_kind()?;
    let id = order.id;
    let (title, body) = match kind {
        NotificationKind::OrderPreparing => (
            "Order is Being Prepared",
            format!("Your order #{id} is now being prepared! We'll notify you when it's ready for shipping."),
        ),
        NotificationKind::OrderShipping => (
            "Order is On The Way",
            format!("Your order #{id} is now out for delivery! It should arrive soon."),
        ),
        NotificationKind::OrderCompleted => (
            "Order Completed",
            format!("Your order #{id} has been completed. Thank you for your purchase!"),
        ),
        NotificationKind::OrderCancelled => (
            "Order Cancelled",
            format!("Your order #{id} has been cancelled. Please contact us if you have any questions."),
        ),
        _ => return None,
    };
    Some(Notice::for_order(order.customer_id, id, kind, title.to_string(), body))
}

impl<D: DatabaseDriver> Shop<D> {
    /// Move an order along its lifecycle and tell the customer about it.
    ///
    /// Re-applying the current status changes nothing and notifies nobody.
    #[instrument(level = "debug", skip(self))]
    pub async fn transition_order_status(&self, actor: &Actor, order_id: i32, status: OrderStatus) -> Result<Order> {
        self.guard(actor, Operation::TransitionOrder).await?;
        let order = self.order_record(order_id).await?;
        self.apply_order_status(actor, order, status).await
    }

    /// Take a pending order into the kitchen and clear the caller's "new order" alerts for it.
    #[instrument(level = "debug", skip(self))]
    pub async fn accept_order(&self, actor: &Actor, order_id: i32) -> Result<Order> {
        self.guard(actor, Operation::TransitionOrder).await?;
        let order = self.order_record(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ShopError::validation(format!(
                "Order #{order_id} is {}, only pending orders can be accepted",
                order.status
            )));
        }

        let order = self.apply_order_status(actor, order, OrderStatus::Preparing).await?;

        Notifications::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(actor.id))
            .filter(notification::Column::OrderId.eq(order_id))
            .filter(notification::Column::Kind.eq(NotificationKind::NewOrder))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db())
            .await?;

        Ok(order)
    }

    async fn apply_order_status(&self, actor: &Actor, order: Order, status: OrderStatus) -> Result<Order> {
        let current = order.status;
        if current == status {
            return Ok(order);
        }
        if !current.can_transition_to(status) {
            return Err(ShopError::validation(format!(
                "Order #{} can't go from {current} to {status}",
                order.id
            )));
        }

        let db = self.db();
        let order_id = order.id;
        let cash_on_delivery = order.payment_method == PaymentMethod::Cod;
        let mut am: order::ActiveModel = order.into();
        am.status = Set(status);
        am.updated_at = Set(Utc::now());
        if status == OrderStatus::Completed && cash_on_delivery {
            am.payment_status = Set(PaymentStatus::Paid);
        }

        // Only the status we looked at may be replaced; a concurrent transition wins.
        let updated = Orders::update_many()
            .set(am)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current))
            .exec(&db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(ShopError::validation(format!(
                "Order #{order_id} changed while being updated"
            )));
        }

        let order = self.order_record(order_id).await?;
        info!(order_id, by = actor.id, from = %current, to = %status, "Order status changed");

        if let Some(notice) = status_notice(&order) {
            self.notify(notice).await;
        }
        Ok(order)
    }

    /// An order with its items. Customers only see their own; staff see everything.
    #[instrument(level = "debug", skip(self))]
    pub async fn order(&self, actor: &Actor, order_id: i32) -> Result<OrderDetails> {
        let order = if actor.is_staff() {
            self.guard(actor, Operation::ViewAllOrders).await?;
            self.order_record(order_id).await?
        }
        else {
            self.guard(actor, Operation::ViewOwnOrders).await?;
            let order = self.order_record(order_id).await?;
            if order.customer_id != actor.id {
                return Err(ShopError::not_found("Order", order_id));
            }
            order
        };

        let items = order
            .find_related(OrderItems)
            .order_by_asc(order_item::Column::Id)
            .all(&self.db())
            .await?;
        Ok(OrderDetails { order, items })
    }

    /// The caller's orders, newest first.
    pub async fn customer_orders(&self, actor: &Actor) -> Result<Vec<Order>> {
        self.guard(actor, Operation::ViewOwnOrders).await?;
        Ok(Orders::find()
            .filter(order::Column::CustomerId.eq(actor.id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&self.db())
            .await?)
    }

    /// Every order, optionally narrowed to one status; newest first.
    pub async fn all_orders(&self, actor: &Actor, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        self.guard(actor, Operation::ViewAllOrders).await?;
        let mut query = Orders::find();
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&self.db())
            .await?)
    }

    async fn order_record(&self, order_id: i32) -> Result<Order> {
        Orders::find_by_id(order_id)
            .one(&self.db())
            .await?
            .ok_or_else(|| ShopError::not_found("Order", order_id))
    }
}
