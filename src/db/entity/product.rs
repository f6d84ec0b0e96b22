use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::ProductCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(deny_unknown_fields)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:           i32,
    pub name:         String,
    pub description:  String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price:        Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))", nullable)]
    pub bundle_price: Option<Decimal>,
    // Never negative after a committed operation.
    pub stock:        i32,
    pub category:     ProductCategory,
    pub is_active:    bool,
    pub created_at:   DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn low_stock(&self, threshold: i32) -> bool {
        self.stock > 0 && self.stock <= threshold
    }
}
