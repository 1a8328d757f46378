//! Order Repository

use super::{RepoError, RepoResult};
use shared::models::Order;
use sqlx::SqlitePool;
use sqlx::types::Json;

const ORDER_SELECT: &str = "SELECT id, customer_email, librarian_email, items, total, order_status, payment_status, tracking_id, ordered_at FROM orders";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_customer(pool: &SqlitePool, email: &str) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE customer_email = ? ORDER BY ordered_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(email)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_librarian(pool: &SqlitePool, email: &str) -> RepoResult<Vec<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE librarian_email = ? ORDER BY ordered_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(email)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Insert an order. A tracking id collision surfaces as [`RepoError::Duplicate`].
pub async fn create(pool: &SqlitePool, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, customer_email, librarian_email, items, total, order_status, payment_status, tracking_id, ordered_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(order.id)
    .bind(&order.customer_email)
    .bind(&order.librarian_email)
    .bind(Json(&order.items))
    .bind(order.total)
    .bind(&order.order_status)
    .bind(order.payment_status.as_str())
    .bind(&order.tracking_id)
    .bind(order.ordered_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Writes `order_status` only; payment status and tracking id are left alone.
pub async fn update_status(pool: &SqlitePool, id: i64, status: &str) -> RepoResult<Order> {
    let rows = sqlx::query("UPDATE orders SET order_status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {id} not found")))
}
