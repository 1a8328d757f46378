//! Order API Module
//!
//! Payment status is never written here; it changes only through
//! payment confirmation.

mod handler;

use axum::{
    Router,
    routing::get,
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        // ?email= 只能查自己的订单
        .route("/orders", get(handler::list_own).post(handler::create))
        .route("/orders/librarian", get(handler::list_for_librarian))
        .route(
            "/orders/{id}",
            get(handler::get_by_id).patch(handler::update_status),
        )
}
