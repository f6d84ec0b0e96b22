use sea_orm::sea_query::Expr;
use sea_orm::ColumnTrait;
use sea_orm::EntityTrait;
use sea_orm::PaginatorTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;

use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::notification;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::policy::Actor;
use crate::policy::Operation;

impl<D: DatabaseDriver> Shop<D> {
    /// The caller's inbox, newest first.
    pub async fn notifications(&self, actor: &Actor) -> Result<Vec<Notification>> {
        self.guard(actor, Operation::ReadInbox).await?;
        Ok(Notifications::find()
            .filter(notification::Column::UserId.eq(actor.id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(&self.db())
            .await?)
    }

    pub async fn unread_notification_count(&self, actor: &Actor) -> Result<u64> {
        self.guard(actor, Operation::ReadInbox).await?;
        Ok(Notifications::find()
            .filter(notification::Column::UserId.eq(actor.id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&self.db())
            .await?)
    }

    pub async fn mark_notification_read(&self, actor: &Actor, notification_id: i32) -> Result<()> {
        self.guard(actor, Operation::ReadInbox).await?;
        let res = Notifications::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(notification_id))
            .filter(notification::Column::UserId.eq(actor.id))
            .exec(&self.db())
            .await?;
        if res.rows_affected == 0 {
            return Err(ShopError::not_found("Notification", notification_id));
        }
        Ok(())
    }

    /// Returns how many notifications were flipped to read.
    pub async fn mark_all_notifications_read(&self, actor: &Actor) -> Result<u64> {
        self.guard(actor, Operation::ReadInbox).await?;
        let res = Notifications::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(actor.id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
