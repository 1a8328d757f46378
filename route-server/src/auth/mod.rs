//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`IdentityResolver`] - 凭证 → 身份 → 角色
//! - [`AccessGuard`] - 按操作表判定访问权限
//! - [`Identity`] - axum 提取器

pub mod extractor;
pub mod guard;
pub mod identity;
pub mod jwt;

pub use guard::{AccessGuard, Grant, Operation, Requirement};
pub use identity::{
    Identity, IdentityError, IdentityProvider, IdentityResolver, JwtIdentityProvider,
    VerifiedIdentity,
};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
