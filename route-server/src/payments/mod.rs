//! 支付模块
//!
//! - `checkout`: 创建结账会话、支付流水查询
//! - `reconcile`: 支付确认对账 (幂等)

pub mod checkout;
pub mod reconcile;

pub use checkout::{CheckoutService, CheckoutUrls};
pub use reconcile::ReconciliationEngine;
