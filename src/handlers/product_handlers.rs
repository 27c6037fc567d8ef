//! Conventional-server adapter: `/products` and `/products/search` on the
//! axum router.
//! No CORS handling; any method other than GET gets the shared 405.

use crate::{
    handlers::products_api::{self, ApiRequest, ApiResponse, Endpoint},
    services::catalog_service::CatalogService,
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, Method, Uri, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

/// Any method on `/products` or `/products/search`.
pub async fn products(
    State(service): State<CatalogService>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let request = ApiRequest {
        endpoint: Endpoint::from_path(uri.path()),
        method,
        query,
    };
    products_api::handle(&service, request).await.into_response()
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => {
                let mut response = Response::new(Body::from(body));
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                response
            }
            None => Response::new(Body::empty()),
        };
        *response.status_mut() = self.status;
        response
    }
}
