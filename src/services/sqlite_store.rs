//! src/services/sqlite_store.rs
//!
//! SqliteProductStore — product rows in a local SQLite table. Images are a
//! JSON text column holding storage paths; nothing here resolves them.

use crate::{
    models::product::StoredProduct,
    services::product_store::{ProductStore, SearchPage, SearchQuery, SortField, StoreResult},
};
use async_trait::async_trait;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

const PRODUCT_COLUMNS: &str = "id, name, description, price, images, user_id, created_at";
/// Rows may carry any RFC 3339 offset or precision, so order on the instant.
const CREATED_AT_KEY: &str = "julianday(created_at)";
const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct SqliteProductStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteProductStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema statement by statement.
    pub async fn migrate(&self) -> StoreResult<usize> {
        let statements = INIT_MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(statements.len())
    }
}

/// Append the WHERE clause shared by the page query and the count query.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &SearchQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(text) = &query.text {
        let pattern = format!("%{}%", escape_like(text));
        builder.push(" AND (name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR description LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
    if let Some(min) = query.min_price {
        builder.push(" AND price >= ");
        builder.push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND price <= ");
        builder.push_bind(max);
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn fetch_all(&self) -> StoreResult<Vec<StoredProduct>> {
        let rows = sqlx::query_as::<_, StoredProduct>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY {CREATED_AT_KEY} DESC, id ASC"
        ))
        .fetch_all(&*self.db)
        .await?;
        debug!(count = rows.len(), "fetched all products");
        Ok(rows)
    }

    async fn fetch_by_id(&self, id: &str) -> StoreResult<Option<StoredProduct>> {
        let row = sqlx::query_as::<_, StoredProduct>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    async fn search(&self, query: &SearchQuery) -> StoreResult<SearchPage<StoredProduct>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&*self.db).await?;

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut builder, query);
        // Column and direction come from a closed enum, never from raw input.
        let sort_key = match query.sort {
            SortField::CreatedAt => CREATED_AT_KEY,
            other => other.column(),
        };
        builder.push(format!(
            " ORDER BY {} {}, id ASC LIMIT ",
            sort_key,
            if query.descending { "DESC" } else { "ASC" }
        ));
        builder.push_bind(i64::from(query.page_size));
        builder.push(" OFFSET ");
        builder.push_bind(query.offset() as i64);

        let data: Vec<StoredProduct> = builder.build_query_as().fetch_all(&*self.db).await?;
        debug!(total, returned = data.len(), "searched products");

        Ok(SearchPage {
            data,
            total: total.max(0) as u64,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}
