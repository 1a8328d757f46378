//! 图书目录
//!
//! 公共浏览不需要身份；上架、修改、删除经过访问守卫和 [`CatalogGuard`]。

pub mod guard;

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{BOOK_STATUS_PUBLISHED, Book, BookCreate, BookUpdate};
use shared::util::{now_millis, snowflake_id};

use crate::auth::{AccessGuard, Identity, Operation};
use crate::db::RecordStore;

pub use guard::{CatalogGuard, ManagementScope};

fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::with_message(
            ErrorCode::BookInvalidPrice,
            format!("price must be a non-negative number, got {price}"),
        ));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> AppResult<()> {
    if quantity < 0 {
        return Err(AppError::validation(format!(
            "quantity must be non-negative, got {quantity}"
        )));
    }
    Ok(())
}

fn require_text(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            format!("{field} is required"),
        ));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
    guard: AccessGuard,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecordStore>, guard: AccessGuard) -> Self {
        Self { store, guard }
    }

    /// Published books, newest first
    pub async fn list_public(&self) -> AppResult<Vec<Book>> {
        let books = self.store.list_books().await?;
        Ok(books
            .into_iter()
            .filter(|b| b.status == BOOK_STATUS_PUBLISHED)
            .collect())
    }

    pub async fn get_public(&self, id: i64) -> AppResult<Book> {
        self.store
            .find_book(id)
            .await?
            .filter(|b| b.status == BOOK_STATUS_PUBLISHED)
            .ok_or_else(|| book_not_found(id))
    }

    pub async fn create_book(&self, identity: &Identity, data: BookCreate) -> AppResult<Book> {
        let grant = self.guard.authorize(identity, Operation::CreateBook).await?;

        validate_price(data.price)?;
        validate_quantity(data.quantity)?;
        let book = Book {
            id: snowflake_id(),
            title: require_text(&data.title, "title")?,
            author: require_text(&data.author, "author")?,
            description: data.description,
            image_url: data.image_url,
            price: data.price,
            quantity: data.quantity,
            status: data
                .status
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| BOOK_STATUS_PUBLISHED.to_string()),
            owner_librarian_email: grant.email,
            created_at: now_millis(),
        };

        self.store.insert_book(&book).await?;
        tracing::info!(book_id = book.id, owner = %book.owner_librarian_email, "Book created");
        Ok(book)
    }

    pub async fn update_book(
        &self,
        id: i64,
        mut data: BookUpdate,
        identity: &Identity,
    ) -> AppResult<Book> {
        let grant = self.guard.authorize(identity, Operation::UpdateBook).await?;
        let book = self.store.find_book(id).await?.ok_or_else(|| book_not_found(id))?;
        CatalogGuard::ensure_can_mutate(&grant, &book)?;

        if let Some(price) = data.price {
            validate_price(price)?;
        }
        if let Some(quantity) = data.quantity {
            validate_quantity(quantity)?;
        }
        data.title = data.title.as_deref().map(|t| require_text(t, "title")).transpose()?;
        data.author = data.author.as_deref().map(|a| require_text(a, "author")).transpose()?;
        data.status = data.status.as_deref().map(|s| require_text(s, "status")).transpose()?;

        let updated = self.store.update_book(id, &data).await?;
        tracing::info!(book_id = id, by = %grant.email, "Book updated");
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i64, identity: &Identity) -> AppResult<()> {
        let grant = self.guard.authorize(identity, Operation::DeleteBook).await?;
        if !self.store.delete_book(id).await? {
            return Err(book_not_found(id));
        }
        tracing::info!(book_id = id, by = %grant.email, "Book deleted");
        Ok(())
    }

    /// Management view: admin sees every book, a librarian their own.
    pub async fn list_managed(&self, identity: &Identity) -> AppResult<Vec<Book>> {
        let grant = self
            .guard
            .authorize(identity, Operation::ListManagedBooks)
            .await?;
        let books = match CatalogGuard::management_scope(&grant) {
            ManagementScope::All => self.store.list_books().await?,
            ManagementScope::OwnedBy(email) => self.store.list_books_by_owner(&email).await?,
        };
        Ok(books)
    }
}

fn book_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::BookNotFound, format!("Book {id} not found"))
}
