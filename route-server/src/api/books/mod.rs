//! Book API Module
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /books | GET | 已上架图书 | 公开 |
//! | /books/{id} | GET | 图书详情 | 公开 |
//! | /books/manage | GET | 管理视图 | librarian (自己的) / admin (全部) |
//! | /books | POST | 上架 | librarian / admin |
//! | /books/{id} | PATCH | 修改 | 所属 librarian / admin |
//! | /books/{id} | DELETE | 删除 | admin |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/books", get(handler::list).post(handler::create))
        .route("/books/manage", get(handler::list_managed))
        .route(
            "/books/{id}",
            get(handler::get_by_id)
                .patch(handler::update)
                .delete(handler::delete),
        )
}
