pub mod admin;
pub mod auth;
pub mod books;
pub mod cart;
pub mod orders;
pub mod rentals;
