//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`users`] - 注册、角色管理
//! - [`books`] - 图书目录
//! - [`orders`] - 订单
//! - [`payments`] - 结账、支付确认、支付流水、Stripe webhook

pub mod books;
pub mod health;
pub mod orders;
pub mod payments;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(books::router())
        .merge(orders::router())
        .merge(payments::router())
}

/// Build a fully configured application with all middleware and state
///
/// Used by the HTTP server and by integration tests (`oneshot`).
pub fn build_app(state: &ServerState) -> Router {
    build_router()
        // CORS - dashboard runs on another origin
        .layer(CorsLayer::permissive())
        // Whole-request bound, answers 408 on expiry
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone())
}
