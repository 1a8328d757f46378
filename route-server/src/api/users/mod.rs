//! User API Module
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /users | POST | 注册 | 公开 |
//! | /users | GET | 用户列表 | admin |
//! | /users/me | GET | 当前用户 + 角色 | 已登录 |
//! | /users/role/{id} | PATCH | 修改角色 | admin |

mod handler;

use axum::{
    Router,
    routing::{get, patch},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/users", get(handler::list).post(handler::register))
        .route("/users/me", get(handler::me))
        .route("/users/role/{id}", patch(handler::change_role))
}
