use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::InventoryAction;

/// Append-only audit of stock mutations. `new_stock == previous_stock + quantity` for every row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_logs")]
#[serde(deny_unknown_fields)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:             i32,
    pub product_id:     i32,
    pub action:         InventoryAction,
    /// Signed change applied to the stock.
    pub quantity:       i32,
    pub previous_stock: i32,
    pub new_stock:      i32,
    pub notes:          Option<String>,
    pub created_by:     i32,
    pub created_at:     DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
