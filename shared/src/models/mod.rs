//! Data models
//!
//! Shared between route-server and the dashboard frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflake ids, all timestamps are Unix millis.
//! JSON field names are camelCase to match the dashboard.

pub mod book;
pub mod order;
pub mod payment;
pub mod user;

// Re-exports
pub use book::*;
pub use order::*;
pub use payment::*;
pub use user::*;
