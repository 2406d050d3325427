pub mod auth;
pub mod contracted;
pub mod contracts;
pub mod health;
pub mod pendencies;
pub mod reports;
pub mod roles;
pub mod users;
