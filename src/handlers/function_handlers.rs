//! Serverless-function adapter.
//!
//! Accepts the platform's function event (`httpMethod`, `path`,
//! `queryStringParameters`) and returns a function response (`statusCode`,
//! `headers`, `body`). Answers CORS preflight itself and attaches the CORS
//! headers to every response, error and panic paths included.
//!
//! Reachable in-process (`handle_event`), over HTTP at
//! `/.netlify/functions/products[/search]`, and from the CLI via `--invoke`.

use crate::{
    handlers::products_api::{self, ApiRequest, ApiResponse, Endpoint},
    services::catalog_service::CatalogService,
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    /// Request path; a trailing `/search` selects the search endpoint.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<ApiResponse> for FunctionResponse {
    fn from(response: ApiResponse) -> Self {
        let mut headers: BTreeMap<String, String> = CORS_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if response.body.is_some() {
            headers.insert("Content-Type".into(), "application/json".into());
        }
        Self {
            status_code: response.status.as_u16(),
            headers,
            body: response.body,
        }
    }
}

/// Handle one function invocation.
pub async fn handle_event(service: &CatalogService, event: FunctionEvent) -> FunctionResponse {
    let method = match Method::from_bytes(event.http_method.to_ascii_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(_) => {
            return ApiResponse::from(crate::errors::AppError::method_not_allowed()).into();
        }
    };

    if method == Method::OPTIONS {
        return ApiResponse::no_content().into();
    }

    let request = ApiRequest {
        endpoint: event
            .path
            .as_deref()
            .map(Endpoint::from_path)
            .unwrap_or_default(),
        method,
        query: event.query_string_parameters.unwrap_or_default(),
    };
    products_api::handle(service, request).await.into()
}

/// Parse a raw event document, handle it, and serialize the response.
pub async fn invoke_json(service: &CatalogService, raw_event: &str) -> anyhow::Result<String> {
    let event: FunctionEvent = serde_json::from_str(raw_event)?;
    let response = handle_event(service, event).await;
    Ok(serde_json::to_string(&response)?)
}

/// Any method on `/.netlify/functions/products` or `.../products/search`.
pub async fn products_function(
    State(service): State<CatalogService>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let event = FunctionEvent {
        http_method: method.to_string(),
        path: Some(uri.path().to_string()),
        query_string_parameters: Some(query),
    };
    handle_event(&service, event).await.into_response()
}

impl IntoResponse for FunctionResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body.map(Body::from).unwrap_or_else(Body::empty));
        *response.status_mut() =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        response
    }
}
