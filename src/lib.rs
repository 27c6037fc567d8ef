//! Read-only product catalog API.
//!
//! Product rows come from a backing store (`SqliteProductStore` or the hosted
//! `RestProductStore`), image paths are resolved to public URLs by
//! `PublicBucketResolver`, and two HTTP adapters share one handler:
//! `/products` for conventional servers and `/.netlify/functions/products`
//! for the serverless-function shape with CORS.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use axum::Router;
use services::catalog_service::CatalogService;

/// The full router with `service` attached as shared state.
pub fn build_app(service: CatalogService) -> Router {
    routes::routes::routes().with_state(service)
}
