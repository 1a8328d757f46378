//! Payment API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use shared::error::AppResult;
use shared::models::{CheckoutLink, CheckoutRequest, Payment, ReconciliationResult};

use crate::auth::Identity;
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub email: Option<String>,
}

pub async fn create_checkout_session(
    State(state): State<ServerState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutLink>> {
    Ok(Json(state.checkout.create_checkout_session(payload).await?))
}

/// Confirm a checkout session. Safe to repeat: a replay answers
/// `alreadyProcessed: true` with the original tracking id.
pub async fn confirm(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<Json<ReconciliationResult>> {
    let result = state
        .reconciler
        .reconcile(&query.session_id, &identity)
        .await?;
    Ok(Json(result))
}

pub async fn list(
    State(state): State<ServerState>,
    identity: Identity,
    Query(query): Query<PaymentsQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state
        .checkout
        .list_payments(&identity, query.email.as_deref())
        .await?;
    Ok(Json(payments))
}
