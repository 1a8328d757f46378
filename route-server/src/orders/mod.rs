//! 订单模块
//!
//! - `tracking`: 运单号生成
//! - `money`: 金额计算 (rust_decimal)
//! - `manager`: 订单生命周期

pub mod manager;
pub mod money;
pub mod tracking;

pub use manager::OrderManager;
pub use tracking::TrackingId;
