//! Checkout session creation and the payment ledger view

use std::sync::Arc;
use std::time::Duration;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{CheckoutLink, CheckoutRequest, Payment, PaymentStatus};
use shared::util::normalize_email;

use crate::auth::{AccessGuard, Identity, Operation};
use crate::db::RecordStore;
use crate::gateway::{GatewayError, NewCheckoutSession, PaymentGateway};
use crate::orders::money;

/// Redirect targets after the hosted checkout page
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// `{site}/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}` and
    /// `{site}/dashboard/payment-cancelled`. The placeholder is filled in by Stripe.
    pub fn for_site(site_domain: &str) -> Self {
        let site = site_domain.trim_end_matches('/');
        Self {
            success_url: format!(
                "{site}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{site}/dashboard/payment-cancelled"),
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    guard: AccessGuard,
    urls: CheckoutUrls,
    currency: String,
    gateway_timeout: Duration,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        guard: AccessGuard,
        urls: CheckoutUrls,
        currency: impl Into<String>,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            guard,
            urls,
            currency: currency.into(),
            gateway_timeout,
        }
    }

    /// Open a hosted checkout page for an unpaid order.
    pub async fn create_checkout_session(&self, req: CheckoutRequest) -> AppResult<CheckoutLink> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "name is required",
            ));
        }
        if !req.price.is_finite() || req.price <= 0.0 {
            return Err(AppError::validation(format!(
                "price must be positive, got {}",
                req.price
            )));
        }

        let order = self.store.find_order(req.order_id).await?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", req.order_id),
            )
        })?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(AppError::with_message(
                ErrorCode::OrderAlreadyPaid,
                format!("Order {} is already paid", order.id),
            ));
        }

        // 金额以订单总额为准，客户端价格只做核对
        let amount_minor = money::to_minor_units(order.total)?;
        if money::to_minor_units(req.price)? != amount_minor {
            return Err(AppError::validation(format!(
                "price {} does not match order total {}",
                req.price, order.total
            ))
            .with_detail("field", "price"));
        }

        let session = NewCheckoutSession {
            order_id: order.id,
            order_name: name.to_string(),
            amount_minor,
            currency: self.currency.clone(),
            customer_email: req
                .email
                .as_deref()
                .map(normalize_email)
                .filter(|e| !e.is_empty()),
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
        };

        let link = tokio::time::timeout(self.gateway_timeout, self.gateway.create_session(&session))
            .await
            .map_err(|_| GatewayError::Unavailable("create_session timed out".into()))??;

        tracing::info!(
            order_id = order.id,
            session_id = %link.id,
            amount_minor,
            "Checkout session opened"
        );
        Ok(CheckoutLink { url: link.url })
    }

    /// Ledger, newest first. With an email: the caller's own payments only.
    /// Without: the whole ledger, admin only.
    pub async fn list_payments(
        &self,
        identity: &Identity,
        email: Option<&str>,
    ) -> AppResult<Vec<Payment>> {
        match email.filter(|e| !e.trim().is_empty()) {
            Some(email) => {
                let grant = self
                    .guard
                    .authorize_subject(identity, Operation::ListOwnPayments, email)
                    .await?;
                Ok(self.store.list_payments(Some(&grant.email)).await?)
            }
            None => {
                self.guard
                    .authorize(identity, Operation::ListAllPayments)
                    .await?;
                Ok(self.store.list_payments(None).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_urls() {
        let urls = CheckoutUrls::for_site("https://read-route.example/");
        assert_eq!(
            urls.success_url,
            "https://read-route.example/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            urls.cancel_url,
            "https://read-route.example/dashboard/payment-cancelled"
        );
    }
}
