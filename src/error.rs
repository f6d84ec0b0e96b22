use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;

use crate::policy::Operation;
use crate::types::Role;

pub type Result<T, E = ShopError> = std::result::Result<T, E>;

/// Failures surfaced by the shop operations. Every variant is recoverable at the caller's boundary.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Insufficient stock for {product}: requested {requested}, only {available} available")]
    InsufficientStock {
        product_id: i32,
        product:    String,
        requested:  i32,
        available:  i32,
    },

    #[error("The cart is empty")]
    EmptyCart,

    #[error("Reservation date {date} is outside of the allowed window {earliest}..={latest}")]
    InvalidDate {
        date:     NaiveDate,
        earliest: NaiveDate,
        latest:   NaiveDate,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{role} is not permitted to {operation}")]
    Permission { role: Role, operation: Operation },

    /// A row changed between reading and writing it. Retried like backend lock conflicts.
    #[error("Concurrent update of {0}")]
    Conflict(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation<S: ToString>(msg: S) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Backend conflicts that are worth retrying the whole transaction for: SQLite lock contention and Postgres
    /// serialization failures or deadlocks.
    pub fn is_transient(&self) -> bool {
        let err = match self {
            Self::Database(err) => err,
            Self::Conflict(_) => return true,
            _ => return false,
        };
        let msg = err.to_string().to_lowercase();
        msg.contains("database is locked")
            || msg.contains("database table is locked")
            || msg.contains("sqlite_busy")
            || msg.contains("could not serialize access")
            || msg.contains("deadlock detected")
    }
}

impl From<garde::Report> for ShopError {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}
