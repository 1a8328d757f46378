//! Book API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::AppResult;
use shared::models::{Book, BookCreate, BookUpdate};

use crate::auth::Identity;
use crate::core::ServerState;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_public().await?))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.catalog.get_public(id).await?))
}

pub async fn list_managed(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_managed(&identity).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<BookCreate>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.catalog.create_book(&identity, payload).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(payload): Json<BookUpdate>,
) -> AppResult<Json<Book>> {
    Ok(Json(state.catalog.update_book(id, payload, &identity).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    state.catalog.delete_book(id, &identity).await?;
    Ok(Json(true))
}
