pub mod cart;
pub mod cart_item;
pub mod customer;
pub mod inventory_log;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod reservation;
pub mod reservation_item;

pub use cart::Entity as Carts;
pub use cart::Model as Cart;
pub use cart_item::Entity as CartItems;
pub use cart_item::Model as CartItem;
pub use customer::Entity as Customers;
pub use customer::Model as Customer;
pub use inventory_log::Entity as InventoryLogs;
pub use inventory_log::Model as InventoryLog;
pub use notification::Entity as Notifications;
pub use notification::Model as Notification;
pub use order::Entity as Orders;
pub use order::Model as Order;
pub use order_item::Entity as OrderItems;
pub use order_item::Model as OrderItem;
pub use product::Entity as Products;
pub use product::Model as Product;
pub use reservation::Entity as Reservations;
pub use reservation::Model as Reservation;
pub use reservation_item::Entity as ReservationItems;
pub use reservation_item::Model as ReservationItem;
