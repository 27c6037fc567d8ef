//! Transport-agnostic products endpoint.
//!
//! Every adapter (axum route, serverless function event, CLI invocation)
//! reduces its native request to an `ApiRequest`, calls `handle`, and renders
//! the returned `ApiResponse` in its own terms.
//!
//! | Request                         | Outcome                                 |
//! |---------------------------------|-----------------------------------------|
//! | `GET products ?id=X`            | 200 product, 404 not found, 500 failure |
//! | `GET products`                  | 200 array, 500 failure                  |
//! | `GET products/search ?q=..`     | 200 `{data,total}`, 400 bad params, 500 |
//! | anything else                   | 405 `{"error":"Method not allowed"}`    |
//!
//! The list endpoint ignores every query key except `id`, so its response
//! shape never depends on what else a client appends.

use crate::{
    errors::AppError,
    services::catalog_service::{CatalogService, SearchParams},
};
use axum::http::{Method, StatusCode};
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use std::{any::Any, collections::HashMap, panic::AssertUnwindSafe};
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

/// Which resource a request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// The product list, or one product when `id` is given.
    #[default]
    Products,
    /// Filtered, sorted, paged search.
    Search,
}

impl Endpoint {
    /// `.../search` selects search; every other path is the product resource.
    pub fn from_path(path: &str) -> Self {
        if path.trim_end_matches('/').ends_with("/search") {
            Self::Search
        } else {
            Self::Products
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub method: Method,
    pub query: HashMap<String, String>,
}

impl ApiRequest {
    pub fn get(query: &[(&str, &str)]) -> Self {
        Self {
            endpoint: Endpoint::Products,
            method: Method::GET,
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn search(query: &[(&str, &str)]) -> Self {
        Self {
            endpoint: Endpoint::Search,
            ..Self::get(query)
        }
    }

    fn param(&self, key: &str) -> Option<String> {
        self.query.get(key).cloned()
    }

    /// `id`, treating an empty value as absent.
    fn product_id(&self) -> Option<&str> {
        self.query
            .get("id")
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    fn search_params(&self) -> SearchParams {
        SearchParams {
            q: self.param("q"),
            min_price: self.param("min_price"),
            max_price: self.param("max_price"),
            sort: self.param("sort"),
            order: self.param("order"),
            page: self.param("page"),
            page_size: self.param("page_size"),
        }
    }
}

/// Status plus an optional JSON body; headers are the adapter's business.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<String>,
}

impl ApiResponse {
    fn ok<T: Serialize>(value: &T) -> Result<Self, AppError> {
        Ok(Self {
            status: StatusCode::OK,
            body: Some(serde_json::to_string(value)?),
        })
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

impl From<AppError> for ApiResponse {
    fn from(err: AppError) -> Self {
        Self {
            status: err.status,
            body: Some(err.body()),
        }
    }
}

/// Route one request. Never fails: errors and panics become JSON responses.
pub async fn handle(service: &CatalogService, request: ApiRequest) -> ApiResponse {
    let span = info_span!(
        "products",
        request_id = %Uuid::new_v4(),
        method = %request.method,
        endpoint = ?request.endpoint,
        id = request.product_id().unwrap_or("")
    );

    async move {
        match AssertUnwindSafe(route(service, &request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                if err.status.is_server_error() {
                    error!(status = err.status.as_u16(), "{}", err.message);
                } else {
                    warn!(status = err.status.as_u16(), "{}", err.message);
                }
                err.into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("handler panicked: {}", message);
                AppError::internal(message).into()
            }
        }
    }
    .instrument(span)
    .await
}

async fn route(service: &CatalogService, request: &ApiRequest) -> Result<ApiResponse, AppError> {
    if request.method != Method::GET {
        return Err(AppError::method_not_allowed());
    }

    if request.endpoint == Endpoint::Search {
        let page = service.search(&request.search_params()).await?;
        return ApiResponse::ok(&json!({ "data": page.data, "total": page.total }));
    }

    if let Some(id) = request.product_id() {
        let product = service.get_by_id(id).await?;
        return ApiResponse::ok(&product);
    }

    let products = service.list().await?;
    ApiResponse::ok(&products)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
