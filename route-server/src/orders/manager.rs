//! Order Lifecycle Manager
//!
//! Creates orders (tracking id assigned here, once), updates fulfillment
//! status and serves the customer and librarian views. Payment status is
//! never written from this module; see `payments::reconcile`.

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{ORDER_STATUS_PENDING, Order, OrderCreate, PaymentStatus};
use shared::util::{normalize_email, now_millis, snowflake_id};

use super::money;
use super::tracking::TrackingId;
use crate::auth::{AccessGuard, Identity, Operation};
use crate::db::{RecordStore, RepoError};
use crate::security_log;

/// Attempts before giving up on a tracking id collision
const TRACKING_ID_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct OrderManager {
    store: Arc<dyn RecordStore>,
    guard: AccessGuard,
}

impl OrderManager {
    pub fn new(store: Arc<dyn RecordStore>, guard: AccessGuard) -> Self {
        Self { store, guard }
    }

    /// Place an order for the caller.
    pub async fn create_order(&self, identity: &Identity, data: OrderCreate) -> AppResult<Order> {
        let grant = self.guard.authorize(identity, Operation::CreateOrder).await?;

        if data.items.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::OrderEmpty,
                "Order must contain at least one item",
            ));
        }
        let librarian_email = normalize_email(&data.librarian_email);
        if librarian_email.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "librarianEmail is required",
            ));
        }
        for item in &data.items {
            money::validate_item(item)?;
        }
        let total = money::order_total(&data.items);

        let mut order = Order {
            id: snowflake_id(),
            customer_email: grant.email,
            librarian_email,
            items: data.items,
            total,
            order_status: ORDER_STATUS_PENDING.to_string(),
            payment_status: PaymentStatus::Unpaid,
            tracking_id: String::new(),
            ordered_at: now_millis(),
        };

        for attempt in 1..=TRACKING_ID_ATTEMPTS {
            order.tracking_id = TrackingId::generate()?.into_inner();
            match self.store.insert_order(&order).await {
                Ok(()) => {
                    tracing::info!(
                        order_id = order.id,
                        tracking_id = %order.tracking_id,
                        customer = %order.customer_email,
                        total = order.total,
                        "Order created"
                    );
                    return Ok(order);
                }
                Err(RepoError::Duplicate(msg)) => {
                    tracing::warn!(attempt, error = %msg, "Order insert collided, retrying");
                    order.id = snowflake_id();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::with_message(
            ErrorCode::TrackingIdExhausted,
            "Could not allocate a unique tracking id",
        ))
    }

    /// Set `orderStatus`. Librarians may only touch orders addressed to them.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: &str,
        identity: &Identity,
    ) -> AppResult<Order> {
        let grant = self
            .guard
            .authorize(identity, Operation::UpdateOrderStatus)
            .await?;

        let new_status = new_status.trim();
        if new_status.is_empty() {
            return Err(AppError::validation("orderStatus must not be empty"));
        }

        let order = self.load(order_id).await?;
        if !grant.is_admin() && order.librarian_email != grant.email {
            security_log!(
                "WARN",
                "order_not_owner",
                email = grant.email.as_str(),
                order_id = order_id
            );
            return Err(AppError::not_owner("order"));
        }

        let updated = self.store.update_order_status(order_id, new_status).await?;
        tracing::info!(order_id, status = new_status, by = %grant.email, "Order status updated");
        Ok(updated)
    }

    /// The caller's own orders, newest first.
    pub async fn list_orders_for_customer(
        &self,
        email: &str,
        identity: &Identity,
    ) -> AppResult<Vec<Order>> {
        let grant = self
            .guard
            .authorize_subject(identity, Operation::ListOwnOrders, email)
            .await?;
        Ok(self.store.list_orders_by_customer(&grant.email).await?)
    }

    /// Fulfillment queue of a librarian, newest first. Admins may read any queue.
    pub async fn list_orders_for_librarian(
        &self,
        librarian_email: &str,
        identity: &Identity,
    ) -> AppResult<Vec<Order>> {
        let grant = self
            .guard
            .authorize(identity, Operation::ListLibrarianOrders)
            .await?;

        let librarian_email = normalize_email(librarian_email);
        if !grant.is_admin() && librarian_email != grant.email {
            security_log!(
                "WARN",
                "subject_mismatch",
                email = grant.email.as_str(),
                operation = Operation::ListLibrarianOrders.name()
            );
            return Err(AppError::forbidden("forbidden access"));
        }

        Ok(self.store.list_orders_by_librarian(&librarian_email).await?)
    }

    /// Single order, visible to its customer, its librarian and admins.
    pub async fn get_order(&self, order_id: i64, identity: &Identity) -> AppResult<Order> {
        let grant = self.guard.authorize(identity, Operation::ViewOrder).await?;
        let order = self.load(order_id).await?;

        let visible = grant.is_admin()
            || order.customer_email == grant.email
            || order.librarian_email == grant.email;
        if !visible {
            return Err(AppError::not_owner("order"));
        }
        Ok(order)
    }

    async fn load(&self, order_id: i64) -> AppResult<Order> {
        self.store.find_order(order_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order {order_id} not found"))
        })
    }
}
