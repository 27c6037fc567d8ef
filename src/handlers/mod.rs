pub mod function_handlers;
pub mod health_handlers;
pub mod product_handlers;
pub mod products_api;
