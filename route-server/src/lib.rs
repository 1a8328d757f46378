//! Read-On-Route 后端 - 图书目录、订单与支付对账服务
//!
//! # 架构概述
//!
//! 请求先经过身份解析 (`auth::identity`)，再由访问守卫 (`auth::guard`) 按操作表
//! 判定角色，然后进入具体业务组件：
//!
//! - **订单** (`orders`): 创建订单、分配运单号、更新履约状态
//! - **支付** (`payments`): 创建结账会话、支付确认对账 (幂等)
//! - **目录** (`catalog`): 图书上架与馆员归属检查
//! - **用户** (`users`): 注册、角色变更
//! - **存储** (`db`): SQLite 记录存储，唯一拥有持久化状态
//! - **网关** (`gateway`): Stripe Checkout REST 客户端
//!
//! # 模块结构
//!
//! ```text
//! route-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT、身份解析、访问守卫
//! ├── db/            # 记录存储 + repository
//! ├── gateway/       # 支付网关
//! ├── orders/        # 订单生命周期、运单号
//! ├── payments/      # 对账引擎、结账
//! ├── catalog/       # 目录守卫
//! ├── users/         # 用户服务
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod auth;
pub mod catalog;
pub mod core;
pub mod db;
pub mod gateway;
pub mod orders;
pub mod payments;
pub mod users;
pub mod utils;

// Re-export 公共类型
pub use auth::{AccessGuard, Grant, Identity, IdentityResolver, Operation};
pub use core::{Config, Server, ServerState};
pub use db::{RecordStore, SqliteStore};
pub use gateway::{PaymentGateway, StripeGateway};
pub use orders::OrderManager;
pub use payments::{CheckoutService, ReconciliationEngine};

// Re-export unified error types from shared
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
