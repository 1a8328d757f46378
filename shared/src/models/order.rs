//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Initial fulfilment status of a new order
pub const ORDER_STATUS_PENDING: &str = "pending";

/// Payment state of an order. Only ever moves `Unpaid -> Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// Line item snapshot taken at order time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub book_id: i64,
    pub title: String,
    pub quantity: i64,
    /// Unit price in major currency units
    pub unit_price: f64,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub customer_email: String,
    pub librarian_email: String,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub order_status: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub payment_status: PaymentStatus,
    /// Assigned once at creation, never rewritten
    pub tracking_id: String,
    pub ordered_at: i64,
}

/// Create order payload. The customer is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub librarian_email: String,
    pub items: Vec<OrderItem>,
}

/// Update fulfilment status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub order_status: String,
}
