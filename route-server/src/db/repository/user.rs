//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{Role, User};
use sqlx::SqlitePool;

const USER_SELECT: &str = "SELECT id, email, name, photo_url, role, created_at FROM users";

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE email = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<User>> {
    let sql = format!("{USER_SELECT} ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Insert a user. A taken email surfaces as [`RepoError::Duplicate`].
pub async fn create(pool: &SqlitePool, user: &User) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO users (id, email, name, photo_url, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.photo_url)
    .bind(user.role.as_str())
    .bind(user.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_role(pool: &SqlitePool, id: i64, role: Role) -> RepoResult<User> {
    let rows = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id} not found")))
}
