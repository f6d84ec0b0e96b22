use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
#[serde(deny_unknown_fields)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:         i32,
    #[sea_orm(unique, indexed)]
    pub username:   String,
    pub email:      String,
    pub role:       Role,
    pub phone:      Option<String>,
    pub address:    Option<String>,
    pub created_at: DateTimeUtc,
    /// Set when the account is closed. Closed accounts keep their orders and reservations.
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
