//! RestProductStore — product rows served by a hosted PostgREST endpoint
//! (`{base_url}/rest/v1/products`), authenticated with a project API key.

use crate::{
    models::product::StoredProduct,
    services::product_store::{ProductStore, SearchPage, SearchQuery, StoreError, StoreResult},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct RestProductStore {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestProductStore {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/rest/v1/products", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    fn get(&self) -> RequestBuilder {
        self.client
            .get(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        Self::check(request.send().await?).await
    }

    /// Turn any non-success status into `StoreError::Status`.
    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "backing store rejected request");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn rows(response: Response) -> StoreResult<Vec<StoredProduct>> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| StoreError::Decode(err.to_string()))
    }
}

/// Quote a value for use inside a PostgREST `or=(...)` list.
fn quote_filter_value(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Extract the total from `Content-Range: 0-9/42` (or `*/0` for no rows).
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn content_range_total(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
}

#[async_trait]
impl ProductStore for RestProductStore {
    async fn fetch_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let request = self
            .get()
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let rows = Self::rows(self.send(request).await?).await?;
        debug!(count = rows.len(), "fetched all products");
        Ok(rows)
    }

    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<StoredProduct>> {
        let filter = format!("eq.{id}");
        let request = self.get().query(&[("select", "*"), ("id", filter.as_str())]);
        let rows = Self::rows(self.send(request).await?).await?;
        Ok(rows.into_iter().next())
    }

    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage<StoredProduct>> {
        let mut params: Vec<(&str, String)> = vec![("select", "*".into())];
        if let Some(text) = &query.text {
            let pattern = quote_filter_value(&format!("*{text}*"));
            params.push((
                "or",
                format!("(name.ilike.{pattern},description.ilike.{pattern})"),
            ));
        }
        if let Some(min) = query.min_price {
            params.push(("price", format!("gte.{min}")));
        }
        if let Some(max) = query.max_price {
            params.push(("price", format!("lte.{max}")));
        }
        params.push((
            "order",
            format!(
                "{}.{}",
                query.sort.column(),
                if query.descending { "desc" } else { "asc" }
            ),
        ));

        let start = query.offset();
        let end = start + u64::from(query.page_size) - 1;
        let request = self
            .get()
            .query(&params)
            .header("Range-Unit", "items")
            .header(header::RANGE, format!("{start}-{end}"))
            .header("Prefer", "count=exact");

        let response = request.send().await?;
        // A page past the last row is answered with 416 and `Content-Range: */N`.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            if let Some(total) = content_range_total(&response) {
                debug!(total, start, "requested page is past the last row");
                return Ok(SearchPage {
                    data: Vec::new(),
                    total,
                });
            }
        }
        let response = Self::check(response).await?;
        let total = content_range_total(&response)
            .ok_or_else(|| StoreError::Decode("missing or invalid Content-Range".into()))?;
        let data = Self::rows(response).await?;
        debug!(total, returned = data.len(), "searched products");

        Ok(SearchPage { data, total })
    }

    async fn ping(&self) -> StoreResult<()> {
        let request = self.get().query(&[("select", "id"), ("limit", "1")]);
        self.send(request).await?;
        Ok(())
    }
}
