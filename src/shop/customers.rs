use chrono::Utc;
use garde::Validate;
use sea_orm::ActiveModelTrait;
use sea_orm::ColumnTrait;
use sea_orm::EntityTrait;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use tracing::instrument;

use super::Shop;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::cart;
use crate::db::entity::cart_item;
use crate::db::entity::customer;
use crate::db::prelude::*;
use crate::error::Result;
use crate::error::ShopError;
use crate::policy::Actor;
use crate::policy::Operation;
use crate::types::Role;

#[derive(Debug, Clone, Validate, Deserialize)]
pub struct NewCustomer {
    #[garde(length(min = 3, max = 150))]
    pub username: String,
    #[garde(length(max = 254), contains("@"))]
    pub email:    String,
    #[garde(skip)]
    pub phone:    Option<String>,
    #[garde(skip)]
    pub address:  Option<String>,
}

impl NewCustomer {
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email:    email.to_string(),
            phone:    None,
            address:  None,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }
}

impl<D: DatabaseDriver> Shop<D> {
    #[instrument(level = "debug", skip(self, new), fields(username = %new.username))]
    pub async fn register_customer(&self, new: NewCustomer) -> Result<Customer> {
        self.insert_customer(new, Role::Customer).await
    }

    /// Administrator accounts bypass self-registration; used when seeding a fresh database.
    #[instrument(level = "debug", skip(self, new), fields(username = %new.username))]
    pub async fn create_admin(&self, new: NewCustomer) -> Result<Customer> {
        self.insert_customer(new, Role::Admin).await
    }

    #[instrument(level = "debug", skip(self, new), fields(username = %new.username))]
    pub async fn create_staff(&self, admin: &Actor, new: NewCustomer) -> Result<Customer> {
        self.guard(admin, Operation::ManageCustomers).await?;
        self.insert_customer(new, Role::Staff).await
    }

    async fn insert_customer(&self, mut new: NewCustomer, role: Role) -> Result<Customer> {
        new.username = new.username.trim().to_string();
        new.email = new.email.trim().to_string();
        new.validate()?;

        let db = self.db();
        if self.customer_by_username(&new.username).await?.is_some() {
            return Err(ShopError::validation(format!("Username '{}' is already taken", new.username)));
        }

        let customer = customer::ActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            role: Set(role),
            phone: Set(non_blank(new.phone)),
            address: Set(non_blank(new.address)),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        info!(id = customer.id, %role, "Registered {}", customer.username);
        Ok(customer)
    }

    pub async fn customer_by_username(&self, username: &str) -> Result<Option<Customer>> {
        Ok(Customers::find()
            .filter(customer::Column::Username.eq(username))
            .one(&self.db())
            .await?)
    }

    #[instrument(level = "debug", skip(self, address))]
    pub async fn update_address(&self, actor: &Actor, address: &str) -> Result<Customer> {
        let customer = self.guard(actor, Operation::UpdateProfile).await?;
        let mut am: customer::ActiveModel = customer.into();
        am.address = Set(non_blank(Some(address.to_string())));
        Ok(am.update(&self.db()).await?)
    }

    /// Close an account. Its orders, reservations and audit rows stay; only the cart goes away.
    #[instrument(level = "debug", skip(self))]
    pub async fn deactivate_customer(&self, admin: &Actor, customer_id: i32) -> Result<Customer> {
        self.guard(admin, Operation::ManageCustomers).await?;
        let customer = self.customer_record(customer_id).await?;
        if !customer.is_active() {
            return Ok(customer);
        }

        let db = self.db();
        if let Some(cart) = Carts::find()
            .filter(cart::Column::CustomerId.eq(customer_id))
            .one(&db)
            .await?
        {
            CartItems::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(&db)
                .await?;
        }

        let mut am: customer::ActiveModel = customer.into();
        am.deleted_at = Set(Some(Utc::now()));
        let customer = am.update(&db).await?;

        info!(by = admin.id, "Deactivated customer #{}", customer.id);
        Ok(customer)
    }

    /// Active administrator accounts, in registration order.
    pub async fn admin_ids(&self) -> Result<Vec<i32>> {
        Ok(Customers::find()
            .filter(customer::Column::Role.eq(Role::Admin))
            .filter(customer::Column::DeletedAt.is_null())
            .order_by_asc(customer::Column::Id)
            .all(&self.db())
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect())
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
