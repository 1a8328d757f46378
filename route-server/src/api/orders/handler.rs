//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderCreate, OrderStatusUpdate};

use crate::auth::Identity;
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    fn require(self) -> AppResult<String> {
        self.email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "email is required"))
    }
}

pub async fn create(
    State(state): State<ServerState>,
    identity: Identity,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.create_order(&identity, payload).await?))
}

/// Customer's own orders
pub async fn list_own(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<Vec<Order>>> {
    // 未指定 email 时默认为调用者本人
    let email = query.email.unwrap_or_else(|| identity.email.clone());
    let orders = state
        .orders
        .list_orders_for_customer(&email, &identity)
        .await?;
    Ok(Json(orders))
}

/// Librarian fulfillment queue
pub async fn list_for_librarian(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<EmailQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let email = query.require()?;
    let orders = state
        .orders
        .list_orders_for_librarian(&email, &identity)
        .await?;
    Ok(Json(orders))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.get_order(id, &identity).await?))
}

pub async fn update_status(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .update_order_status(id, &payload.order_status, &identity)
        .await?;
    Ok(Json(order))
}
