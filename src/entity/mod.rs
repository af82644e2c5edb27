pub mod books;
pub mod order_items;
pub mod orders;
pub mod rentals;
pub mod users;

pub use books::Entity as Books;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use rentals::Entity as Rentals;
pub use users::Entity as Users;
