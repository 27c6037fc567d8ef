//! Core data models for the product catalog.
//!
//! Stored rows map to database tables via `sqlx::FromRow` and to hosted
//! REST payloads via `serde`; served products serialize as JSON.

pub mod product;
