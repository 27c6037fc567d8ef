//! The backing-store seam: everything the catalog needs from the table of
//! product rows. Implementations live in `sqlite_store` and `rest_store`.

use crate::models::product::StoredProduct;
use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Columns a search may be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Price,
    Name,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Price => "price",
            SortField::Name => "name",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at" => Some(SortField::CreatedAt),
            "price" => Some(SortField::Price),
            "name" => Some(SortField::Name),
            _ => None,
        }
    }
}

/// A validated search request. Built by `CatalogService::search`.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name or description.
    pub text: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortField,
    pub descending: bool,
    /// Zero-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: None,
            min_price: None,
            max_price: None,
            sort: SortField::CreatedAt,
            descending: true,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }
}

/// One page of matches plus the number of matches across all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<T> {
    pub data: Vec<T>,
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backing store responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed store response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to product rows. Rows come back in their stored form; image
/// paths are never resolved here.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every row, newest `created_at` first.
    async fn fetch_all(&self) -> StoreResult<Vec<StoredProduct>>;

    /// The row whose id equals `id`, if any.
    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<StoredProduct>>;

    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage<StoredProduct>>;

    /// Cheap connectivity check used by readiness probes.
    async fn ping(&self) -> StoreResult<()>;
}
