//! Payment Gateway
//!
//! [`PaymentGateway`] is the seam between the reconciliation engine and the
//! external checkout provider. [`StripeGateway`] is the production client.

pub mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

pub use stripe::{StripeGateway, verify_webhook_signature};

/// Session payment status as reported by the gateway
pub const SESSION_PAID: &str = "paid";

/// Metadata key carrying the order id
pub const METADATA_ORDER_ID: &str = "orderId";
/// Metadata key carrying the display name of the order
pub const METADATA_ORDER_NAME: &str = "orderName";

/// Parameters for a hosted checkout session
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckoutSession {
    pub order_id: i64,
    pub order_name: String,
    /// Minor currency units
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSessionLink {
    pub id: String,
    pub url: String,
}

/// Gateway-side view of a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    /// Idempotency key for reconciliation
    #[serde(rename = "payment_intent", default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == SESSION_PAID
    }

    /// Ledger key: payment intent, falling back to the session id for
    /// sessions that never created one.
    pub fn transaction_id(&self) -> &str {
        self.payment_intent_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.id)
    }

    pub fn order_id(&self) -> Option<i64> {
        self.metadata
            .get(METADATA_ORDER_ID)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn order_name(&self) -> Option<&str> {
        self.metadata.get(METADATA_ORDER_NAME).map(String::as_str)
    }
}

/// Gateway failure
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or timeout; retryable
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("checkout session not found: {0}")]
    NotFound(String),

    /// The gateway refused the request
    #[error("gateway rejected request: {0}")]
    Rejected(String),

    /// Response could not be understood
    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Payment gateway unavailable");
                AppError::gateway_unavailable("Payment gateway unavailable, try again later")
            }
            GatewayError::Malformed(msg) => {
                tracing::error!(error = %msg, "Malformed payment gateway response");
                AppError::gateway_unavailable("Payment gateway returned an unexpected response")
            }
            GatewayError::NotFound(id) => AppError::with_message(
                ErrorCode::SessionNotFound,
                format!("Checkout session {id} not found"),
            ),
            GatewayError::Rejected(msg) => AppError::with_message(ErrorCode::PaymentFailed, msg),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSessionLink, GatewayError>;

    async fn retrieve_session(&self, session_ref: &str) -> Result<CheckoutSession, GatewayError>;
}

/// Session references go into a URL path; only the gateway's id alphabet is accepted.
pub fn validate_session_ref(session_ref: &str) -> Result<&str, AppError> {
    let session_ref = session_ref.trim();
    if session_ref.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "session_id is required",
        ));
    }
    if session_ref.len() > 255
        || !session_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::invalid_request("Invalid session_id"));
    }
    Ok(session_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(json: &str) -> CheckoutSession {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_session_deserialize() {
        let s = session(
            r#"{"id":"cs_test_1","object":"checkout.session","payment_status":"paid",
                "payment_intent":"pi_1","amount_total":70000,"currency":"bdt",
                "customer_email":"a@x.com","metadata":{"orderId":"42","orderName":"Dune"}}"#,
        );
        assert!(s.is_paid());
        assert_eq!(s.transaction_id(), "pi_1");
        assert_eq!(s.order_id(), Some(42));
        assert_eq!(s.order_name(), Some("Dune"));
        assert_eq!(s.amount_total, Some(70000));
    }

    #[test]
    fn test_session_without_intent() {
        let s = session(r#"{"id":"cs_test_2","payment_status":"unpaid","payment_intent":null}"#);
        assert!(!s.is_paid());
        assert_eq!(s.transaction_id(), "cs_test_2");
        assert_eq!(s.order_id(), None);
    }

    #[test]
    fn test_garbled_order_id() {
        let s = session(
            r#"{"id":"cs_3","payment_status":"paid","metadata":{"orderId":"not-a-number"}}"#,
        );
        assert_eq!(s.order_id(), None);
    }

    #[test]
    fn test_validate_session_ref() {
        assert_eq!(validate_session_ref(" cs_test_a1 ").unwrap(), "cs_test_a1");
        assert_eq!(
            validate_session_ref("").unwrap_err().code,
            ErrorCode::RequiredField
        );
        assert_eq!(
            validate_session_ref("../v1/customers").unwrap_err().code,
            ErrorCode::InvalidRequest
        );
    }

    #[test]
    fn test_gateway_error_mapping() {
        let e: AppError = GatewayError::Unavailable("timeout".into()).into();
        assert_eq!(e.code, ErrorCode::GatewayUnavailable);
        let e: AppError = GatewayError::NotFound("cs_x".into()).into();
        assert_eq!(e.code, ErrorCode::SessionNotFound);
        let e: AppError = GatewayError::Rejected("card declined".into()).into();
        assert_eq!(e.code, ErrorCode::PaymentFailed);
    }
}
