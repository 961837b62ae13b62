pub mod auth;
pub mod chat_service;
pub mod forecast_service;
pub mod inventory_service;
pub mod order_service;
