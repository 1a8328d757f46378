//! Book Model

use serde::{Deserialize, Serialize};

/// Default status for newly listed books
pub const BOOK_STATUS_PUBLISHED: &str = "published";

/// Book entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Price in major currency units
    pub price: f64,
    pub quantity: i64,
    /// Free-form publication status ("published", "unpublished", ...)
    pub status: String,
    /// Librarian who listed the book
    pub owner_librarian_email: String,
    pub created_at: i64,
}

/// Create book payload (owner is the caller)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreate {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub status: Option<String>,
}

/// Update book payload; ownership cannot be changed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub status: Option<String>,
}
