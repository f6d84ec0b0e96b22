pub mod cart;
pub mod customer;
pub mod inventory_log;
pub mod notification;
pub mod order;
pub mod product;
pub mod reservation;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    // Referenced tables go first; Postgres refuses foreign keys to tables that don't exist yet.
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(customer::Migration),
            Box::new(product::Migration),
            Box::new(cart::Migration),
            Box::new(order::Migration),
            Box::new(inventory_log::Migration),
            Box::new(reservation::Migration),
            Box::new(notification::Migration),
        ]
    }
}
