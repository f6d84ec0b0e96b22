//! Role-based authorization.
//!
//! Every caller-facing operation names itself with an [`Operation`] and asks [`authorize`] before touching storage.
use serde::Serialize;
use strum::Display;

use crate::error::Result;
use crate::error::ShopError;
use crate::types::Role;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id:   i32,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i32, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Staff | Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    SignIn,
    UpdateProfile,
    ManageCart,
    Checkout,
    ViewOwnOrders,
    CreateReservation,
    CancelReservation,
    ViewOwnReservations,
    ReadInbox,
    ViewAllOrders,
    ViewAllReservations,
    TransitionOrder,
    TransitionReservation,
    ManageProducts,
    ManageInventory,
    ManageCustomers,
}

/// The single authorization table: may `role` perform `op`?
pub fn is_allowed(role: Role, op: Operation) -> bool {
    use Operation::*;

    match op {
        SignIn | UpdateProfile | ReadInbox => true,
        ManageCart | Checkout | ViewOwnOrders | CreateReservation | CancelReservation | ViewOwnReservations => {
            role == Role::Customer
        }
        ViewAllOrders | ViewAllReservations | TransitionOrder | TransitionReservation => {
            matches!(role, Role::Staff | Role::Admin)
        }
        ManageProducts | ManageInventory | ManageCustomers => role == Role::Admin,
    }
}

pub fn authorize(actor: &Actor, operation: Operation) -> Result<()> {
    if is_allowed(actor.role, operation) {
        Ok(())
    }
    else {
        Err(ShopError::Permission {
            role: actor.role,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customers_shop_but_do_not_administer() {
        assert!(is_allowed(Role::Customer, Operation::Checkout));
        assert!(is_allowed(Role::Customer, Operation::ManageCart));
        assert!(!is_allowed(Role::Customer, Operation::TransitionOrder));
        assert!(!is_allowed(Role::Customer, Operation::ManageInventory));
    }

    #[test]
    fn staff_handle_orders_only() {
        assert!(is_allowed(Role::Staff, Operation::TransitionOrder));
        assert!(is_allowed(Role::Staff, Operation::TransitionReservation));
        assert!(!is_allowed(Role::Staff, Operation::ManageProducts));
        assert!(!is_allowed(Role::Staff, Operation::Checkout));
    }

    #[test]
    fn admin_is_denied_customer_shopping() {
        assert!(is_allowed(Role::Admin, Operation::ManageInventory));
        assert!(!is_allowed(Role::Admin, Operation::ManageCart));
    }

    #[test]
    fn everyone_signs_in_and_reads_inbox() {
        for role in [Role::Customer, Role::Staff, Role::Admin] {
            assert!(is_allowed(role, Operation::UpdateProfile));
            assert!(is_allowed(role, Operation::ReadInbox));
            assert!(is_allowed(role, Operation::SignIn));
        }
    }

    #[test]
    fn reservation_views_split_by_role() {
        assert!(is_allowed(Role::Customer, Operation::ViewOwnReservations));
        assert!(!is_allowed(Role::Customer, Operation::ViewAllReservations));
        assert!(is_allowed(Role::Staff, Operation::ViewAllReservations));
        assert!(!is_allowed(Role::Staff, Operation::ViewOwnReservations));
        assert!(is_allowed(Role::Admin, Operation::ViewAllReservations));
    }

    #[test]
    fn denial_names_role_and_operation() {
        let err = authorize(&Actor::new(7, Role::Customer), Operation::ManageProducts).unwrap_err();
        assert_eq!(err.to_string(), "customer is not permitted to manage_products");
    }
}
