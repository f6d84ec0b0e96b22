//! Relational storage: entities, schema migrations and backend drivers.
pub mod driver;
pub mod entity;
pub mod migrations;

pub mod prelude {
    pub use super::entity::*;
}
