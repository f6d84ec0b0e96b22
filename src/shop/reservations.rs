use chrono::Days;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::EntityTrait;
use sea_orm::ModelTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::Set;
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::customers::non_blank;
use super::finish;
use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::reservation;
use crate::db::entity::reservation_item;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::notify::Notice;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::pricing::round_money;
use crate::types::NotificationKind;
use crate::types::ReservationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreOrderItem {
    pub product_id: i32,
    pub quantity:   i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewReservation {
    pub date:             NaiveDate,
    pub time:             NaiveTime,
    pub guests:           i32,
    pub special_requests: Option<String>,
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub items:            Vec<PreOrderItem>,
}

impl NewReservation {
    pub fn new(date: NaiveDate, time: NaiveTime, guests: i32) -> Self {
        Self {
            date,
            time,
            guests,
            special_requests: None,
            delivery_address: None,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, product_id: i32, quantity: i32) -> Self {
        self.items.push(PreOrderItem { product_id, quantity });
        self
    }
}

/// A pre-order line that didn't make it into the reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub product_id: i32,
    pub quantity:   i32,
    pub reason:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationReceipt {
    pub reservation: Reservation,
    pub items:       Vec<ReservationItem>,
    pub skipped:     Vec<SkippedItem>,
    /// Accepted items only.
    pub total:       Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub items:       Vec<ReservationItem>,
}

impl ReservationDetails {
    pub fn total(&self) -> Decimal {
        self.items.iter().map(ReservationItem::total).sum()
    }
}

fn status_notice(reservation: &Reservation) -> Option<Notice> {
    let kind = reservation.status.notification_kind()?;
    let id = reservation.id;
    let when = format!("{} at {}", reservation.reservation_date, reservation.reservation_time.format("%H:%M"));
    let (title, body) = match kind {
        NotificationKind::ReservationConfirmed => (
            "Reservation Confirmed",
            format!("Your reservation #{id} for {when} has been confirmed!"),
        ),
        NotificationKind::ReservationCancelled => (
            "Reservation Cancelled",
            format!("Your reservation #{id} for {when} has been cancelled."),
        ),
        NotificationKind::ReservationCompleted => (
            "Reservation Completed",
            format!("Your reservation #{id} has been completed. Thank you for dining with us!"),
        ),
        _ => return None,
    };
    Some(Notice::for_reservation(
        reservation.customer_id,
        id,
        kind,
        title.to_string(),
        body,
    ))
}

impl<D: DatabaseDriver> Shop<D> {
    /// Book a table, optionally with pre-ordered dishes.
    ///
    /// Dishes the shop can't currently supply are left out and reported in the receipt. Reservations never touch
    /// the stock.
    #[instrument(level = "debug", skip(self, new), fields(date = %new.date, guests = new.guests))]
    pub async fn create_reservation(&self, actor: &Actor, new: NewReservation) -> Result<ReservationReceipt> {
        let customer = self.guard(actor, Operation::CreateReservation).await?;

        let earliest = self.today();
        let latest = earliest
            .checked_add_days(Days::new(u64::from(self.config.reservation_window_days)))
            .unwrap_or(NaiveDate::MAX);
        if new.date < earliest || new.date > latest {
            return Err(ShopError::InvalidDate {
                date: new.date,
                earliest,
                latest,
            });
        }
        if new.guests < 1 {
            return Err(ShopError::validation("A reservation needs at least one guest"));
        }

        let txn = self.db().begin().await?;
        let outcome: Result<ReservationReceipt> = async {
            let now = Utc::now();
            let reservation = reservation::ActiveModel {
                customer_id: Set(actor.id),
                reservation_date: Set(new.date),
                reservation_time: Set(new.time),
                number_of_guests: Set(new.guests),
                special_requests: Set(non_blank(new.special_requests.clone())),
                delivery_address: Set(non_blank(new.delivery_address.clone())),
                status: Set(ReservationStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            let mut items = Vec::new();
            let mut skipped = Vec::new();
            for wanted in &new.items {
                let product = Products::find_by_id(wanted.product_id).one(&txn).await?;
                let reason = match &product {
                    _ if wanted.quantity < 1 => Some("quantity must be at least 1".to_string()),
                    None => Some("no such product".to_string()),
                    Some(p) if !p.is_active => Some(format!("{} is no longer sold", p.name)),
                    Some(p) if wanted.quantity > p.stock => Some(format!("only {} of {} in stock", p.stock, p.name)),
                    Some(_) => None,
                };

                match (reason, product) {
                    (None, Some(product)) => {
                        let item = reservation_item::ActiveModel {
                            reservation_id: Set(reservation.id),
                            product_id: Set(product.id),
                            quantity: Set(wanted.quantity),
                            price: Set(round_money(product.price)),
                            ..Default::default()
                        }
                        .insert(&txn)
                        .await?;
                        items.push(item);
                    }
                    (reason, _) => {
                        let reason = reason.unwrap_or_else(|| "no such product".to_string());
                        warn!(
                            product_id = wanted.product_id,
                            quantity = wanted.quantity,
                            "Pre-order item skipped: {reason}"
                        );
                        skipped.push(SkippedItem {
                            product_id: wanted.product_id,
                            quantity: wanted.quantity,
                            reason,
                        });
                    }
                }
            }

            let total = items.iter().map(ReservationItem::total).sum();
            Ok(ReservationReceipt {
                reservation,
                items,
                skipped,
                total,
            })
        }
        .await;
        let receipt = finish(txn, outcome).await?;

        let reservation = &receipt.reservation;
        info!(
            reservation_id = reservation.id,
            customer = actor.id,
            items = receipt.items.len(),
            skipped = receipt.skipped.len(),
            "Reservation created"
        );

        let mut body = format!(
            "New reservation from {} for {} at {} - {} guests",
            customer.username,
            reservation.reservation_date,
            reservation.reservation_time.format("%H:%M"),
            reservation.number_of_guests
        );
        if receipt.total > Decimal::ZERO {
            body.push_str(&format!(" - Pre-order total: {:.2}", receipt.total));
        }
        let reservation_id = reservation.id;
        self.notify_admins(|admin| {
            Notice::for_reservation(
                admin,
                reservation_id,
                NotificationKind::NewReservation,
                "New Reservation".to_string(),
                body.clone(),
            )
        })
        .await;

        Ok(receipt)
    }

    /// Customers may call off their own reservations until they are completed.
    #[instrument(level = "debug", skip(self))]
    pub async fn cancel_reservation(&self, actor: &Actor, reservation_id: i32) -> Result<Reservation> {
        self.guard(actor, Operation::CancelReservation).await?;

        let reservation = self.reservation_record(reservation_id).await?;
        if reservation.customer_id != actor.id {
            return Err(ShopError::not_found("Reservation", reservation_id));
        }
        if !reservation.status.is_cancellable() {
            return Err(ShopError::validation(format!(
                "Reservation #{reservation_id} is {} and can't be cancelled",
                reservation.status
            )));
        }

        let reservation = self.set_reservation_status(reservation, ReservationStatus::Cancelled).await?;
        info!(reservation_id, by = actor.id, "Reservation cancelled by customer");
        Ok(reservation)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn transition_reservation_status(
        &self,
        actor: &Actor,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> Result<Reservation> {
        self.guard(actor, Operation::TransitionReservation).await?;

        let reservation = self.reservation_record(reservation_id).await?;
        let current = reservation.status;
        if current == status {
            return Ok(reservation);
        }
        if !current.is_cancellable() || status == ReservationStatus::Pending {
            return Err(ShopError::validation(format!(
                "Reservation #{reservation_id} can't go from {current} to {status}"
            )));
        }

        let reservation = self.set_reservation_status(reservation, status).await?;
        info!(reservation_id, by = actor.id, from = %current, to = %status, "Reservation status changed");

        if let Some(notice) = status_notice(&reservation) {
            self.notify(notice).await;
        }
        Ok(reservation)
    }

    /// A reservation with its pre-ordered items. Customers only see their own.
    pub async fn reservation(&self, actor: &Actor, reservation_id: i32) -> Result<ReservationDetails> {
        let reservation = if actor.is_staff() {
            self.guard(actor, Operation::ViewAllReservations).await?;
            self.reservation_record(reservation_id).await?
        }
        else {
            self.guard(actor, Operation::ViewOwnReservations).await?;
            let reservation = self.reservation_record(reservation_id).await?;
            if reservation.customer_id != actor.id {
                return Err(ShopError::not_found("Reservation", reservation_id));
            }
            reservation
        };

        let items = reservation
            .find_related(ReservationItems)
            .order_by_asc(reservation_item::Column::Id)
            .all(&self.db())
            .await?;
        Ok(ReservationDetails { reservation, items })
    }

    /// The caller's reservations, soonest first.
    pub async fn customer_reservations(&self, actor: &Actor) -> Result<Vec<Reservation>> {
        self.guard(actor, Operation::ViewOwnReservations).await?;
        Ok(Reservations::find()
            .filter(reservation::Column::CustomerId.eq(actor.id))
            .order_by_asc(reservation::Column::ReservationDate)
            .order_by_asc(reservation::Column::ReservationTime)
            .all(&self.db())
            .await?)
    }

    async fn set_reservation_status(&self, reservation: Reservation, status: ReservationStatus) -> Result<Reservation> {
        let mut am: reservation::ActiveModel = reservation.into();
        am.status = Set(status);
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.db()).await?)
    }

    async fn reservation_record(&self, reservation_id: i32) -> Result<Reservation> {
        Reservations::find_by_id(reservation_id)
            .one(&self.db())
            .await?
            .ok_or_else(|| ShopError::not_found("Reservation", reservation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(status: ReservationStatus) -> Reservation {
        Reservation {
            id: 3,
            customer_id: 9,
            reservation_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            reservation_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            number_of_guests: 4,
            special_requests: None,
            delivery_address: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmation_names_date_and_time() {
        let notice = status_notice(&reservation(ReservationStatus::Confirmed)).unwrap();
        assert_eq!(notice.recipient, 9);
        assert_eq!(notice.reservation_id, Some(3));
        assert_eq!(notice.body, "Your reservation #3 for 2025-06-14 at 18:30 has been confirmed!");
    }

    #[test]
    fn completion_uses_its_own_kind() {
        let notice = status_notice(&reservation(ReservationStatus::Completed)).unwrap();
        assert_eq!(notice.kind, NotificationKind::ReservationCompleted);
        assert!(status_notice(&reservation(ReservationStatus::Pending)).is_none());
    }
}
