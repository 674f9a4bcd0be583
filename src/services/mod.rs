pub mod admin_service;
pub mod auth_service;
pub mod catalog_service;
pub mod delivery_service;
pub mod order_service;
pub mod payment_service;
pub mod return_service;
pub mod salary_service;
