//! Represents a catalog product, in its stored and its served form.
//!
//! The two forms differ only in `images`: storage keeps bucket-relative paths,
//! responses carry public URLs. Only `CatalogService` turns one into the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// A product row exactly as the backing store holds it.
#[derive(Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct StoredProduct {
    /// Store-assigned identifier. Hosted stores may hand out numbers; those
    /// are normalized to their decimal string.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// Display name, never empty.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Non-negative price.
    pub price: f64,

    /// Bucket-relative storage paths, in display order.
    #[sqlx(json)]
    #[serde(default)]
    pub images: Vec<String>,

    /// Owning account.
    pub user_id: String,

    /// Creation time; lists are ordered newest first by this field.
    pub created_at: DateTime<Utc>,
}

/// A product as returned to API callers, with `images` resolved to URLs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Publicly fetchable URLs, same order and count as the stored paths.
    pub images: Vec<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl StoredProduct {
    /// Build the served form, mapping every stored path through `resolve`.
    pub(crate) fn into_resolved(self, resolve: impl Fn(&str) -> String) -> Product {
        let images = self.images.iter().map(|path| resolve(path)).collect();
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            images,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}
