pub mod catalog_service;
pub mod image_urls;
pub mod product_store;
pub mod rest_store;
pub mod sqlite_store;
