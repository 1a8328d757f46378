//! User API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use shared::error::AppResult;
use shared::models::{RoleUpdate, User, UserCreate, UserProfile};

use crate::auth::Identity;
use crate::core::ServerState;
use crate::users::{MSG_USER_EXISTS, RegisterOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub created: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Register; an existing email answers 200 with "user already exists"
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let response = match state.users.register(payload).await? {
        RegisterOutcome::Created(user) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                created: true,
                message: "user created".into(),
                user: Some(user),
            }),
        ),
        RegisterOutcome::AlreadyExists => (
            StatusCode::OK,
            Json(RegisterResponse {
                created: false,
                message: MSG_USER_EXISTS.into(),
                user: None,
            }),
        ),
    };
    Ok(response)
}

pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.list_users(&identity).await?))
}

pub async fn me(
    State(state): State<ServerState>,
    identity: Identity,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users.profile(&identity).await?))
}

pub async fn change_role(
    State(state): State<ServerState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(payload): Json<RoleUpdate>,
) -> AppResult<Json<User>> {
    let user = state
        .users
        .change_role(id, &payload.role, &identity)
        .await?;
    Ok(Json(user))
}
