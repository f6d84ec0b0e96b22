use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::ReservationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:               i32,
    pub customer_id:      i32,
    pub reservation_date: Date,
    pub reservation_time: Time,
    pub number_of_guests: i32,
    pub special_requests: Option<String>,
    /// Where pre-ordered items go, if anywhere.
    pub delivery_address: Option<String>,
    pub status:           ReservationStatus,
    pub created_at:       DateTimeUtc,
    pub updated_at:       DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::reservation_item::Entity")]
    ReservationItem,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::reservation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
