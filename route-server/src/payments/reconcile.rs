//! Payment Reconciliation Engine
//!
//! Confirms a checkout session against the gateway and records it exactly
//! once. The gateway transaction id is the idempotency key: the ledger has a
//! UNIQUE index on it and [`RecordStore::record_payment`] writes the order
//! update and the payment in one transaction, so concurrent confirmations of
//! the same session produce one payment row.

use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Payment, ReconciliationResult};
use shared::util::{normalize_email, now_millis};

use crate::auth::{AccessGuard, Identity, Operation};
use crate::db::{NewPayment, RecordOutcome, RecordStore, RepoError};
use crate::gateway::{CheckoutSession, GatewayError, PaymentGateway, validate_session_ref};
use crate::orders::{TrackingId, money};

pub const MSG_RECORDED: &str = "payment recorded";
pub const MSG_ALREADY_EXISTS: &str = "already exists";
pub const MSG_NOT_COMPLETED: &str = "payment not completed";

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    guard: AccessGuard,
    gateway_timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        guard: AccessGuard,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            guard,
            gateway_timeout,
        }
    }

    /// Confirm a checkout session on behalf of a verified caller.
    ///
    /// Gateway failures return before anything is written.
    pub async fn reconcile(
        &self,
        session_ref: &str,
        identity: &Identity,
    ) -> AppResult<ReconciliationResult> {
        self.guard
            .authorize(identity, Operation::ConfirmPayment)
            .await?;
        let session_ref = validate_session_ref(session_ref)?;

        let session = self.fetch_session(session_ref).await?;
        tracing::debug!(
            session_id = %session.id,
            payment_status = %session.payment_status,
            caller = %identity.email,
            "Checkout session retrieved"
        );
        self.apply_session(&session).await
    }

    /// Record a session already obtained from the gateway (confirmation or webhook).
    pub async fn apply_session(&self, session: &CheckoutSession) -> AppResult<ReconciliationResult> {
        let transaction_id = session.transaction_id();

        // 1. 已记录过: 直接返回原运单号，不写入
        if let Some(existing) = self.store.find_payment_by_transaction(transaction_id).await? {
            tracing::info!(
                transaction_id,
                tracking_id = %existing.tracking_id,
                "Payment already reconciled"
            );
            return Ok(already_processed(existing));
        }

        // 2. 未支付: 不写入
        if !session.is_paid() {
            tracing::info!(
                session_id = %session.id,
                payment_status = %session.payment_status,
                "Checkout session not paid"
            );
            return Ok(ReconciliationResult {
                success: false,
                already_processed: false,
                message: MSG_NOT_COMPLETED.to_string(),
                transaction_id: None,
                tracking_id: None,
                payment: None,
            });
        }

        // 3. 已支付: 事务内标记订单并追加支付记录
        let order_id = session.order_id().ok_or_else(|| {
            AppError::with_message(
                ErrorCode::SessionMetadataInvalid,
                "Checkout session carries no valid orderId",
            )
        })?;
        let amount_minor = session.amount_total.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::SessionMetadataInvalid,
                "Paid checkout session has no amount_total",
            )
        })?;

        // 实付金额必须等于订单总额
        let order = self.store.find_order(order_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order {order_id} not found"))
        })?;
        if TrackingId::parse(&order.tracking_id).is_none() {
            return Err(AppError::internal(format!(
                "Order {order_id} has a malformed tracking id"
            )));
        }
        let expected_minor = money::to_minor_units(order.total)?;
        if amount_minor != expected_minor {
            tracing::warn!(
                session_id = %session.id,
                order_id,
                amount_minor,
                expected_minor,
                "Paid amount does not match order total"
            );
            return Err(AppError::with_message(
                ErrorCode::SessionMetadataInvalid,
                format!("Paid amount {amount_minor} does not match order total {expected_minor}"),
            )
            .with_detail("expected_minor", expected_minor)
            .with_detail("amount_minor", amount_minor));
        }

        let new = NewPayment {
            transaction_id: transaction_id.to_string(),
            order_id,
            order_name: session.order_name().map(str::to_string),
            amount: money::from_minor_units(amount_minor),
            amount_minor,
            currency: session.currency.clone().unwrap_or_default(),
            customer_email: session.customer_email.as_deref().map(normalize_email),
            payment_status: session.payment_status.clone(),
            paid_at: now_millis(),
        };

        match self.store.record_payment(new).await {
            Ok(RecordOutcome::Recorded(payment)) => {
                tracing::info!(
                    transaction_id = %payment.transaction_id,
                    order_id = payment.order_id,
                    tracking_id = %payment.tracking_id,
                    amount = payment.amount,
                    "Payment reconciled"
                );
                Ok(ReconciliationResult {
                    success: true,
                    already_processed: false,
                    message: MSG_RECORDED.to_string(),
                    transaction_id: Some(payment.transaction_id.clone()),
                    tracking_id: Some(payment.tracking_id.clone()),
                    payment: Some(payment),
                })
            }
            Ok(RecordOutcome::AlreadyRecorded(existing)) => {
                // 并发确认同一会话，另一请求先提交
                tracing::info!(
                    transaction_id = %existing.transaction_id,
                    "Concurrent reconciliation absorbed"
                );
                Ok(already_processed(existing))
            }
            Err(RepoError::NotFound(_)) => Err(AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("Order {order_id} not found"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_session(&self, session_ref: &str) -> Result<CheckoutSession, GatewayError> {
        tokio::time::timeout(self.gateway_timeout, self.gateway.retrieve_session(session_ref))
            .await
            .map_err(|_| {
                GatewayError::Unavailable(format!(
                    "retrieve_session timed out after {}ms",
                    self.gateway_timeout.as_millis()
                ))
            })?
    }
}

fn already_processed(existing: Payment) -> ReconciliationResult {
    ReconciliationResult {
        success: true,
        already_processed: true,
        message: MSG_ALREADY_EXISTS.to_string(),
        transaction_id: Some(existing.transaction_id),
        tracking_id: Some(existing.tracking_id),
        payment: None,
    }
}
