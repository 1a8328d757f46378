//! Stripe Checkout via REST API (no SDK dependency)

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use sha2::Sha256;

use super::{CheckoutSession, CheckoutSessionLink, GatewayError, NewCheckoutSession, PaymentGateway};

/// Webhook events older than this are rejected (seconds)
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl StripeGateway {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        resource: &str,
    ) -> Result<T, GatewayError> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Malformed(e.to_string()));
        }
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        Err(classify_failure(status, &body, resource))
    }
}

/// Map a non-2xx Stripe response to a gateway error
fn classify_failure(status: StatusCode, body: &serde_json::Value, resource: &str) -> GatewayError {
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("no error message")
        .to_string();
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound(resource.to_string()),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Unavailable(message),
        s if s.is_server_error() => GatewayError::Unavailable(format!("{s}: {message}")),
        s => GatewayError::Rejected(format!("{s}: {message}")),
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Unavailable("request timed out".into())
    } else {
        GatewayError::Unavailable(e.to_string())
    }
}

/// Form body for `POST /v1/checkout/sessions` (payment mode, single line item)
fn checkout_form(session: &NewCheckoutSession) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "payment".to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", session.currency.clone()),
        (
            "line_items[0][price_data][unit_amount]",
            session.amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            session.order_name.clone(),
        ),
        ("success_url", session.success_url.clone()),
        ("cancel_url", session.cancel_url.clone()),
    ];
    form.push(("metadata[orderId]", session.order_id.to_string()));
    form.push(("metadata[orderName]", session.order_name.clone()));
    if let Some(email) = &session.customer_email {
        form.push(("customer_email", email.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSessionLink, GatewayError> {
        let resp = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&checkout_form(session))
            .send()
            .await
            .map_err(transport_error)?;

        let link: CheckoutSessionLink = Self::read_json(resp, "checkout session").await?;
        tracing::info!(
            session_id = %link.id,
            order_id = session.order_id,
            amount_minor = session.amount_minor,
            "Stripe checkout session created"
        );
        Ok(link)
    }

    async fn retrieve_session(&self, session_ref: &str) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .client
            .get(self.url(&format!("/v1/checkout/sessions/{session_ref}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_json(resp, session_ref).await
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
///
/// Header format: `t=<unix secs>,v1=<hex>[,v1=<hex>...]`. Any matching `v1`
/// entry is accepted; `now` is unix seconds.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // 常量时间比较 (verify_slice)
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &str, ts: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{ts}.{payload}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, 1_700_000_000));
        assert!(
            verify_webhook_signature(payload.as_bytes(), &header, SECRET, 1_700_000_100).is_ok()
        );
    }

    #[test]
    fn test_any_v1_signature_accepted() {
        let payload = r#"{"id":"evt_2"}"#;
        let header = format!(
            "t=1700000000, v1={}, v1={}",
            "00".repeat(32),
            sign(payload, 1_700_000_000)
        );
        assert!(
            verify_webhook_signature(payload.as_bytes(), &header, SECRET, 1_700_000_000).is_ok()
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = format!("t=1700000000,v1={}", sign(r#"{"a":1}"#, 1_700_000_000));
        assert_eq!(
            verify_webhook_signature(br#"{"a":2}"#, &header, SECRET, 1_700_000_000),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = "{}";
        let header = format!("t=1700000000,v1={}", sign(payload, 1_700_000_000));
        assert_eq!(
            verify_webhook_signature(payload.as_bytes(), &header, SECRET, 1_700_000_301),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn test_missing_parts_rejected() {
        assert!(verify_webhook_signature(b"{}", "v1=abcd", SECRET, 0).is_err());
        assert!(verify_webhook_signature(b"{}", "t=1", SECRET, 0).is_err());
    }

    #[test]
    fn test_checkout_form() {
        let form = checkout_form(&NewCheckoutSession {
            order_id: 42,
            order_name: "Dune".into(),
            amount_minor: 70000,
            currency: "bdt".into(),
            customer_email: Some("a@x.com".into()),
            success_url: "http://s/ok".into(),
            cancel_url: "http://s/no".into(),
        });
        let get = |k: &str| form.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("70000"));
        assert_eq!(get("metadata[orderId]"), Some("42"));
        assert_eq!(get("customer_email"), Some("a@x.com"));
    }

    #[test]
    fn test_classify_failure() {
        let body = serde_json::json!({"error": {"message": "No such checkout.session"}});
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, &body, "cs_1"),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, &body, "cs_1"),
            GatewayError::Unavailable(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, &body, "cs_1"),
            GatewayError::Rejected(_)
        ));
    }
}
