use sea_orm_migration::prelude::*;

use super::customer::Customers;
use super::product::Products;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "reservation_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::CustomerId).integer().not_null())
                    .col(ColumnDef::new(Reservations::ReservationDate).date().not_null())
                    .col(ColumnDef::new(Reservations::ReservationTime).time().not_null())
                    .col(ColumnDef::new(Reservations::NumberOfGuests).integer().not_null())
                    .col(ColumnDef::new(Reservations::SpecialRequests).text().null())
                    .col(ColumnDef::new(Reservations::DeliveryAddress).text().null())
                    .col(ColumnDef::new(Reservations::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reservations-customer_id")
                            .from(Reservations::Table, Reservations::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReservationItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReservationItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReservationItems::ReservationId).integer().not_null())
                    .col(ColumnDef::new(ReservationItems::ProductId).integer().not_null())
                    .col(ColumnDef::new(ReservationItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(ReservationItems::Price).decimal_len(10, 2).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reservation_items-reservation_id")
                            .from(ReservationItems::Table, ReservationItems::ReservationId)
                            .to(Reservations::Table, Reservations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reservation_items-product_id")
                            .from(ReservationItems::Table, ReservationItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    CustomerId,
    ReservationDate,
    ReservationTime,
    NumberOfGuests,
    SpecialRequests,
    DeliveryAddress,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum ReservationItems {
    Table,
    Id,
    ReservationId,
    ProductId,
    Quantity,
    Price,
}
