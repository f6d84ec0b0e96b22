use sea_orm_migration::prelude::*;

use super::customer::Customers;
use super::product::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "inventory_log_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryLogs::ProductId).integer().not_null())
                    .col(ColumnDef::new(InventoryLogs::Action).string_len(20).not_null())
                    .col(ColumnDef::new(InventoryLogs::Quantity).integer().not_null())
                    .col(ColumnDef::new(InventoryLogs::PreviousStock).integer().not_null())
                    .col(ColumnDef::new(InventoryLogs::NewStock).integer().not_null())
                    .col(ColumnDef::new(InventoryLogs::Notes).text().null())
                    .col(ColumnDef::new(InventoryLogs::CreatedBy).integer().not_null())
                    .col(
                        ColumnDef::new(InventoryLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_logs-product_id")
                            .from(InventoryLogs::Table, InventoryLogs::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_logs-created_by")
                            .from(InventoryLogs::Table, InventoryLogs::CreatedBy)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_logs-product_id")
                    .table(InventoryLogs::Table)
                    .col(InventoryLogs::ProductId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum InventoryLogs {
    Table,
    Id,
    ProductId,
    Action,
    Quantity,
    PreviousStock,
    NewStock,
    Notes,
    CreatedBy,
    CreatedAt,
}
