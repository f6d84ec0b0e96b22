use sea_orm_migration::prelude::*;

use super::customer::Customers;
use super::product::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "cart_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Carts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Carts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Carts::CustomerId).integer().not_null())
                    .col(ColumnDef::new(Carts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Carts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .index(
                        Index::create()
                            .name("idx-unique-carts-customer_id")
                            .col(Carts::CustomerId)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-carts-customer_id")
                            .from(Carts::Table, Carts::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CartItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CartItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CartItems::CartId).integer().not_null())
                    .col(ColumnDef::new(CartItems::ProductId).integer().not_null())
                    .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                    // At most one line per product in a cart.
                    .index(
                        Index::create()
                            .name("idx-unique-cart_items-cart-product")
                            .col(CartItems::CartId)
                            .col(CartItems::ProductId)
                            .unique(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cart_items-cart_id")
                            .from(CartItems::Table, CartItems::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cart_items-product_id")
                            .from(CartItems::Table, CartItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CartItems::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(Carts::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub enum Carts {
    Table,
    Id,
    CustomerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum CartItems {
    Table,
    Id,
    CartId,
    ProductId,
    Quantity,
}
