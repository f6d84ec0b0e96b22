use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::OrderStatus;
use crate::types::PaymentMethod;
use crate::types::PaymentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(deny_unknown_fields)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:               i32,
    pub customer_id:      i32,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub subtotal:         Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub delivery_fee:     Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub discount_amount:  Decimal,
    pub discount_details: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total_amount:     Decimal,
    pub status:           OrderStatus,
    pub payment_method:   PaymentMethod,
    pub payment_status:   PaymentStatus,
    pub delivery_address: String,
    pub notes:            Option<String>,
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
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
