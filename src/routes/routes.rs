//! Defines routes for the product catalog.
//!
//! ## Structure
//! - **Conventional endpoints**
//!   - `ANY /products` — `?id=` for one product, the full list otherwise
//!   - `ANY /products/search` — `{data,total}` page for the search parameters
//!   - non-GET methods get 405
//!
//! - **Serverless function endpoints**
//!   - `ANY /.netlify/functions/products` and `.../products/search` — same
//!     contract plus CORS preflight and CORS headers on every response
//!
//! - **Health checks**
//!   - `GET /healthz`, `GET /readyz`

use crate::{
    handlers::{
        function_handlers::products_function,
        health_handlers::{healthz, readyz},
        product_handlers::products,
    },
    services::catalog_service::CatalogService,
};
use axum::{
    Router,
    routing::{any, get},
};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`CatalogService`) to all handlers.
pub fn routes() -> Router<CatalogService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/products", any(products))
        .route("/products/search", any(products))
        .route("/.netlify/functions/products", any(products_function))
        .route("/.netlify/functions/products/search", any(products_function))
}
