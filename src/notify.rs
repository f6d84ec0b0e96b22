//! Outbound user notifications.
//!
//! The shop hands every [`Notice`] to a [`NotificationSink`] once the change it reports is committed. Delivery is
//! best-effort: a failing sink is logged and never undoes the change.
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveModelTrait;
use sea_orm::DatabaseConnection;
use sea_orm::Set;
use serde::Serialize;

use crate::db::entity::notification;
use crate::error::Result;
use crate::types::NotificationKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub recipient:      i32,
    pub kind:           NotificationKind,
    pub title:          String,
    pub body:           String,
    pub order_id:       Option<i32>,
    pub reservation_id: Option<i32>,
}

impl Notice {
    pub fn for_order(recipient: i32, order_id: i32, kind: NotificationKind, title: String, body: String) -> Self {
        Self {
            recipient,
            kind,
            title,
            body,
            order_id: Some(order_id),
            reservation_id: None,
        }
    }

    pub fn for_reservation(
        recipient: i32,
        reservation_id: i32,
        kind: NotificationKind,
        title: String,
        body: String,
    ) -> Self {
        Self {
            recipient,
            kind,
            title,
            body,
            order_id: None,
            reservation_id: Some(reservation_id),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, notice: &Notice) -> Result<()>;
}

/// Stores notices in the `notifications` table, which doubles as the users' inbox.
#[derive(Debug, Clone)]
pub struct DbSink {
    connection: DatabaseConnection,
}

impl DbSink {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl NotificationSink for DbSink {
    async fn deliver(&self, notice: &Notice) -> Result<()> {
        notification::ActiveModel {
            user_id: Set(notice.recipient),
            kind: Set(notice.kind),
            title: Set(notice.title.clone()),
            message: Set(notice.body.clone()),
            order_id: Set(notice.order_id),
            reservation_id: Set(notice.reservation_id),
            is_read: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.connection)
        .await?;

        Ok(())
    }
}
