//! Payment API Module
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /checkout-sessions | POST | 创建结账会话 | 公开 |
//! | /payment-confirmations?session_id= | PATCH | 支付确认对账 | 已登录 |
//! | /payments?email= | GET | 支付流水 | 本人 / admin (全部) |
//! | /stripe/webhook | POST | Stripe 回调 (原始 body 验签) | 签名 |

mod handler;
mod webhook;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/checkout-sessions", post(handler::create_checkout_session))
        .route("/payment-confirmations", patch(handler::confirm))
        .route("/payments", get(handler::list))
        .route("/stripe/webhook", post(webhook::handle_webhook))
}
