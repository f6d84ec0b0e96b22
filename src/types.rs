//! Enumerated column types shared by the entities and the operations.
use sea_orm::DeriveActiveEnum;
use sea_orm::EnumIter;
use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "staff")]
    Staff,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductCategory {
    #[sea_orm(string_value = "spam")]
    Spam,
    #[sea_orm(string_value = "chicken")]
    Chicken,
    #[sea_orm(string_value = "vegetarian")]
    Vegetarian,
    #[sea_orm(string_value = "special")]
    Special,
    #[sea_orm(string_value = "combo")]
    Combo,
}

/// Order lifecycle: `pending → preparing → shipping → completed`, with `cancelled` reachable from any state
/// before `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "shipping")]
    Shipping,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Shipping => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether an administrator may move an order from `self` to `next`. Staying in the same state is always allowed
    /// and treated as a no-op by the caller.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            // Forward only; skipping ahead is fine.
            (Some(from), Some(to)) => to > from,
            (_, None) => true,
            (None, _) => false,
        }
    }

    /// Customer notification sent when an order enters this status.
    pub fn notification_kind(self) -> Option<NotificationKind> {
        match self {
            Self::Pending => None,
            Self::Preparing => Some(NotificationKind::OrderPreparing),
            Self::Shipping => Some(NotificationKind::OrderShipping),
            Self::Completed => Some(NotificationKind::OrderCompleted),
            Self::Cancelled => Some(NotificationKind::OrderCancelled),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    #[sea_orm(string_value = "cod")]
    Cod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl ReservationStatus {
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn notification_kind(self) -> Option<NotificationKind> {
        match self {
            Self::Pending => None,
            Self::Confirmed => Some(NotificationKind::ReservationConfirmed),
            Self::Cancelled => Some(NotificationKind::ReservationCancelled),
            Self::Completed => Some(NotificationKind::ReservationCompleted),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InventoryAction {
    #[sea_orm(string_value = "stock_in")]
    StockIn,
    #[sea_orm(string_value = "stock_out")]
    StockOut,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "sold")]
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "new_order")]
    NewOrder,
    #[sea_orm(string_value = "order_preparing")]
    OrderPreparing,
    #[sea_orm(string_value = "order_shipping")]
    OrderShipping,
    #[sea_orm(string_value = "order_completed")]
    OrderCompleted,
    #[sea_orm(string_value = "order_cancelled")]
    OrderCancelled,
    #[sea_orm(string_value = "new_reservation")]
    NewReservation,
    #[sea_orm(string_value = "reservation_confirmed")]
    ReservationConfirmed,
    #[sea_orm(string_value = "reservation_cancelled")]
    ReservationCancelled,
    #[sea_orm(string_value = "reservation_completed")]
    ReservationCompleted,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn order_moves_forward_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Shipping));
        assert!(Shipping.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Completed));
        assert!(!Shipping.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Shipping));
    }

    #[test]
    fn cancellation_only_before_completion() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Preparing.can_transition_to(Cancelled));
        assert!(Shipping.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn statuses_parse_from_snake_case() {
        assert_eq!(OrderStatus::from_str("preparing").unwrap(), OrderStatus::Preparing);
        assert_eq!(InventoryAction::from_str("stock_in").unwrap(), InventoryAction::StockIn);
        assert_eq!(NotificationKind::NewOrder.to_string(), "new_order");
        assert!(Role::from_str("owner").is_err());
    }
}
