pub mod ai;
pub mod auth;
pub mod inventory;
pub mod orders;
