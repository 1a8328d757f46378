//! Payment Model
//!
//! Payments are an append-only ledger keyed by the gateway transaction id.

use serde::{Deserialize, Serialize};

/// Recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    /// Gateway payment intent id, unique across the ledger
    pub transaction_id: String,
    pub order_id: i64,
    pub order_name: Option<String>,
    /// Major currency units (`amount_minor / 100`)
    pub amount: f64,
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    /// Gateway-reported status at reconciliation time
    pub payment_status: String,
    /// Copied from the order when the payment is recorded
    pub tracking_id: String,
    pub paid_at: i64,
}

/// Request to open a hosted checkout page for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub order_id: i64,
    /// Product name shown on the checkout page
    pub name: String,
    /// Price in major units
    pub price: f64,
    pub email: Option<String>,
}

/// Where the browser should be sent to pay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLink {
    pub url: String,
}

/// Outcome of a payment confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub success: bool,
    /// True when the transaction had already been recorded; nothing was written
    pub already_processed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<Payment>,
}
