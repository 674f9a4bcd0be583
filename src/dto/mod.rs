pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod orders;
pub mod returns;
pub mod salary;
