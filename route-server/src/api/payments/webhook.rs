//! Stripe webhook handler
//!
//! POST /stripe/webhook: raw body for signature verification. Duplicate
//! deliveries are absorbed by the ledger's transaction id uniqueness.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use shared::error::{AppError, ErrorCode};

use crate::core::ServerState;
use crate::gateway::{CheckoutSession, verify_webhook_signature};

pub async fn handle_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    // 未配置密钥时不暴露该端点
    let Some(secret) = state.webhook_secret() else {
        return Ok(StatusCode::NOT_FOUND);
    };

    // 1. Stripe-Signature header
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return Err(AppError::with_message(
            ErrorCode::WebhookSignatureInvalid,
            "Missing Stripe-Signature header",
        ));
    };

    // 2. Verify signature
    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_webhook_signature(&body, sig_header, secret, now) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return Err(AppError::with_message(ErrorCode::WebhookSignatureInvalid, e));
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return Err(AppError::invalid_request("Webhook body is not JSON"));
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(
        event_type = event_type,
        event_id = event["id"].as_str().unwrap_or(""),
        "Received Stripe webhook"
    );

    let status = match event_type {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_completed(&state, &event).await
        }
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };
    Ok(status)
}

/// checkout.session.completed → same reconciliation path as the confirmation endpoint
async fn handle_checkout_completed(state: &ServerState, event: &serde_json::Value) -> StatusCode {
    let Some(object) = event.get("data").and_then(|d| d.get("object")) else {
        return StatusCode::OK;
    };

    let session: CheckoutSession = match serde_json::from_value(object.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(%e, "checkout.session payload not understood");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.reconciler.apply_session(&session).await {
        Ok(result) => {
            tracing::info!(
                session_id = %session.id,
                success = result.success,
                already_processed = result.already_processed,
                "Webhook reconciliation finished"
            );
            StatusCode::OK
        }
        // 重试也无法成功，确认收到即可
        Err(e) if matches!(e.code, ErrorCode::OrderNotFound | ErrorCode::SessionMetadataInvalid) => {
            tracing::warn!(session_id = %session.id, error = %e, "Webhook session cannot be applied");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(session_id = %session.id, error = %e, "Webhook reconciliation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
