//! src/services/catalog_service.rs
//!
//! CatalogService — the read path for products. Fetches stored rows through
//! a `ProductStore` and resolves every image path through an
//! `ImageUrlResolver` before anything leaves this module.

use crate::{
    models::product::{Product, StoredProduct},
    services::{
        image_urls::ImageUrlResolver,
        product_store::{
            MAX_PAGE_SIZE, ProductStore, SearchPage, SearchQuery, SortField, StoreError,
        },
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,
    #[error("{0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Raw search parameters as they arrive on a query string.
#[derive(Clone, Debug, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl SearchParams {
    /// Validate into a `SearchQuery`, applying defaults and clamping the page size.
    pub fn parse(&self) -> CatalogResult<SearchQuery> {
        let mut query = SearchQuery {
            text: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            min_price: parse_price("min_price", self.min_price.as_deref())?,
            max_price: parse_price("max_price", self.max_price.as_deref())?,
            ..SearchQuery::default()
        };

        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(CatalogError::InvalidQuery(
                    "min_price must not exceed max_price".into(),
                ));
            }
        }

        if let Some(sort) = self.sort.as_deref() {
            query.sort = SortField::parse(sort).ok_or_else(|| {
                CatalogError::InvalidQuery(format!(
                    "sort must be one of created_at, price, name (got `{sort}`)"
                ))
            })?;
        }

        query.descending = match self.order.as_deref() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(other) => {
                return Err(CatalogError::InvalidQuery(format!(
                    "order must be asc or desc (got `{other}`)"
                )));
            }
        };

        if let Some(page) = parse_number::<u32>("page", self.page.as_deref())? {
            query.page = page;
        }
        if let Some(size) = parse_number::<u32>("page_size", self.page_size.as_deref())? {
            query.page_size = size.clamp(1, MAX_PAGE_SIZE);
        }

        Ok(query)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> CatalogResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            CatalogError::InvalidQuery(format!("{name} is not a valid number (got `{value}`)"))
        }),
    }
}

/// Like `parse_number`, but `NaN` and the infinities are not prices.
fn parse_price(name: &str, raw: Option<&str>) -> CatalogResult<Option<f64>> {
    match parse_number::<f64>(name, raw)? {
        Some(value) if !value.is_finite() => Err(CatalogError::InvalidQuery(format!(
            "{name} must be a finite number (got `{}`)",
            raw.unwrap_or_default().trim()
        ))),
        price => Ok(price),
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    images: Arc<dyn ImageUrlResolver>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>, images: Arc<dyn ImageUrlResolver>) -> Self {
        Self { store, images }
    }

    fn resolve(&self, row: StoredProduct) -> Product {
        row.into_resolved(|path| self.images.public_url(path))
    }

    /// All products, newest first, with image URLs resolved.
    pub async fn list(&self) -> CatalogResult<Vec<Product>> {
        let rows = self.store.fetch_all().await?;
        debug!(count = rows.len(), "listing products");
        Ok(rows.into_iter().map(|row| self.resolve(row)).collect())
    }

    /// The product with the given id, with image URLs resolved.
    ///
    /// An absent row is `ProductNotFound`; a failing store is `Store`.
    pub async fn get_by_id(&self, id: &str) -> CatalogResult<Product> {
        match self.store.fetch_by_id(id).await? {
            Some(row) => Ok(self.resolve(row)),
            None => Err(CatalogError::ProductNotFound),
        }
    }

    pub async fn search(&self, params: &SearchParams) -> CatalogResult<SearchPage<Product>> {
        let query = params.parse()?;
        let page = self.store.search(&query).await?;
        Ok(SearchPage {
            data: page.data.into_iter().map(|row| self.resolve(row)).collect(),
            total: page.total,
        })
    }

    pub async fn ping(&self) -> CatalogResult<()> {
        Ok(self.store.ping().await?)
    }
}
