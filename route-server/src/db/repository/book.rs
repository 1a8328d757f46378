//! Book Repository

use super::{RepoError, RepoResult};
use shared::models::{Book, BookUpdate};
use sqlx::SqlitePool;

const BOOK_SELECT: &str = "SELECT id, title, author, description, image_url, price, quantity, status, owner_librarian_email, created_at FROM books";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Book>> {
    let sql = format!("{BOOK_SELECT} ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Book>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_owner(pool: &SqlitePool, owner_email: &str) -> RepoResult<Vec<Book>> {
    let sql = format!("{BOOK_SELECT} WHERE owner_librarian_email = ? ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Book>(&sql)
        .bind(owner_email)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Book>> {
    let sql = format!("{BOOK_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, book: &Book) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO books (id, title, author, description, image_url, price, quantity, status, owner_librarian_email, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.description)
    .bind(&book.image_url)
    .bind(book.price)
    .bind(book.quantity)
    .bind(&book.status)
    .bind(&book.owner_librarian_email)
    .bind(book.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Field-level update; `None` keeps the stored value. Ownership is never touched.
pub async fn update(pool: &SqlitePool, id: i64, data: &BookUpdate) -> RepoResult<Book> {
    let rows = sqlx::query(
        "UPDATE books SET title = COALESCE(?1, title), author = COALESCE(?2, author), description = COALESCE(?3, description), image_url = COALESCE(?4, image_url), price = COALESCE(?5, price), quantity = COALESCE(?6, quantity), status = COALESCE(?7, status) WHERE id = ?8",
    )
    .bind(&data.title)
    .bind(&data.author)
    .bind(&data.description)
    .bind(&data.image_url)
    .bind(data.price)
    .bind(data.quantity)
    .bind(&data.status)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Book {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Book {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
