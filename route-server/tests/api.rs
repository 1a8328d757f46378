//! HTTP 层集成测试
//!
//! 通过 `build_app` + `oneshot` 驱动完整路由和中间件

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

use common::{TestApp, paid_session, setup, setup_with};
use route_server::api::build_app;
use shared::error::ErrorCode;
use shared::models::{PaymentStatus, Role};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_app(&app.state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

fn sign(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn webhook(payload: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/stripe/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = setup().await;
    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}

#[tokio::test]
async fn test_user_listing_requires_admin() {
    let app = setup().await;
    app.seed_user("admin@example.com", Role::Admin).await;
    app.seed_user("reader@example.com", Role::User).await;

    let (status, body) = send(&app, get("/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], ErrorCode::NotAuthenticated.code());

    let (status, _) = send(&app, get("/users", Some("Bearer not-a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reader = app.bearer("reader@example.com");
    let (status, body) = send(&app, get("/users", Some(&reader))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], ErrorCode::AdminRequired.code());

    let admin = app.bearer("admin@example.com");
    let (status, body) = send(&app, get("/users", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_register_reports_existing_user() {
    let app = setup().await;
    let payload = json!({ "email": "new@example.com", "name": "New" }).to_string();
    let request = || {
        Request::post("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.clone()))
            .unwrap()
    };

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "user already exists");
}

#[tokio::test]
async fn test_orders_of_another_customer_forbidden() {
    let app = setup().await;
    app.seed_order("reader@example.com", "lib@example.com").await;
    let other = app.bearer("other@example.com");

    let (status, _) = send(
        &app,
        get("/orders?email=reader@example.com", Some(&other)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let reader = app.bearer("reader@example.com");
    let (status, body) = send(&app, get("/orders", Some(&reader))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_confirmation_endpoint_is_idempotent() {
    let app = setup().await;
    let order = app.seed_order("reader@example.com", "lib@example.com").await;
    app.gateway
        .put_session(paid_session("cs_http", "pi_http", order.id, 70000));
    let reader = app.bearer("reader@example.com");
    let confirm = || {
        Request::patch("/payment-confirmations?session_id=cs_http")
            .header(header::AUTHORIZATION, reader.as_str())
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, confirm()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["alreadyProcessed"], false);
    assert_eq!(body["trackingId"], order.tracking_id.as_str());

    let (status, body) = send(&app, confirm()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyProcessed"], true);
    assert_eq!(app.payment_count().await, 1);

    // 未登录不能确认
    let request = Request::patch("/payment-confirmations?session_id=cs_http")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_confirmation_rejects_bad_session_ref() {
    let app = setup().await;
    let reader = app.bearer("reader@example.com");
    let request = Request::patch("/payment-confirmations?session_id=cs%20bad%3B")
        .header(header::AUTHORIZATION, reader.as_str())
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::InvalidRequest.code());
}

#[tokio::test]
async fn test_webhook_disabled_without_secret() {
    let app = setup().await;
    let (status, _) = send(&app, webhook("{}", Some("t=1,v1=00"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signed_webhook_records_payment() {
    let app = setup_with(|c| c.stripe_webhook_secret = Some(WEBHOOK_SECRET.into())).await;
    let order = app.seed_order("reader@example.com", "lib@example.com").await;
    let payload = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": "cs_wh",
                "object": "checkout.session",
                "payment_status": "paid",
                "payment_intent": "pi_wh",
                "amount_total": 70000,
                "currency": "bdt",
                "customer_email": "reader@example.com",
                "metadata": { "orderId": order.id.to_string(), "orderName": "Dune" }
            }
        },
    })
    .to_string();
    let now = chrono::Utc::now().timestamp();

    let (status, body) = send(&app, webhook(&payload, Some("t=1,v1=deadbeef"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::WebhookSignatureInvalid.code());
    let (status, body) = send(&app, webhook(&payload, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], ErrorCode::WebhookSignatureInvalid.code());
    assert_eq!(app.payment_count().await, 0);

    let (status, _) = send(&app, webhook(&payload, Some(&sign(&payload, now)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.payment_count().await, 1);
    assert_eq!(app.order(order.id).await.payment_status, PaymentStatus::Paid);

    // 重复投递
    let (status, _) = send(&app, webhook(&payload, Some(&sign(&payload, now)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.payment_count().await, 1);
}

#[tokio::test]
async fn test_public_catalog_is_open() {
    let app = setup().await;
    let (status, body) = send(&app, get("/books", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_request_answers_408() {
    let app = setup_with(|c| {
        c.request_timeout_ms = 50;
        c.gateway_timeout_ms = 5_000;
    })
    .await;
    let order = app.seed_order("reader@example.com", "lib@example.com").await;
    app.gateway
        .put_session(paid_session("cs_slow", "pi_slow", order.id, 70000));
    app.gateway.set_delay(std::time::Duration::from_millis(500));
    let reader = app.bearer("reader@example.com");
    let request = Request::patch("/payment-confirmations?session_id=cs_slow")
        .header(header::AUTHORIZATION, reader.as_str())
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(app.payment_count().await, 0);
}
