//! Shared types for the Read-On-Route backend
//!
//! Domain models, the unified error system and small utilities used by
//! `route-server` and its tests.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
