//! 用户服务
//!
//! 注册 (公开)、用户列表与角色变更 (管理员)、当前用户信息。
//! 角色只在 `change_role` 中修改。

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Role, User, UserCreate, UserProfile};
use shared::util::{normalize_email, now_millis, snowflake_id};

use crate::auth::{AccessGuard, Identity, Operation};
use crate::db::{RecordStore, RepoError};

pub const MSG_USER_EXISTS: &str = "user already exists";

/// Registration result. An existing email is not an error.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Created(User),
    AlreadyExists,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore>,
    guard: AccessGuard,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>, guard: AccessGuard) -> Self {
        Self { store, guard }
    }

    pub async fn register(&self, data: UserCreate) -> AppResult<RegisterOutcome> {
        let email = normalize_email(&data.email);
        if email.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::RequiredField,
                "email is required",
            ));
        }
        if !email.contains('@') {
            return Err(AppError::validation(format!("invalid email: {email}")));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Ok(RegisterOutcome::AlreadyExists);
        }

        let user = User {
            id: snowflake_id(),
            email,
            name: data.name,
            photo_url: data.photo_url,
            role: Role::User,
            created_at: now_millis(),
        };

        match self.store.insert_user(&user).await {
            Ok(()) => {
                tracing::info!(user_id = user.id, email = %user.email, "User registered");
                Ok(RegisterOutcome::Created(user))
            }
            // 并发注册同一邮箱
            Err(RepoError::Duplicate(_)) => Ok(RegisterOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_users(&self, identity: &Identity) -> AppResult<Vec<User>> {
        self.guard.authorize(identity, Operation::ListUsers).await?;
        Ok(self.store.list_users().await?)
    }

    pub async fn change_role(
        &self,
        user_id: i64,
        role: &str,
        identity: &Identity,
    ) -> AppResult<User> {
        let grant = self
            .guard
            .authorize(identity, Operation::ChangeUserRole)
            .await?;
        let role: Role = role
            .parse()
            .map_err(|e: String| AppError::with_message(ErrorCode::RoleInvalid, e))?;

        match self.store.update_user_role(user_id, role).await {
            Ok(user) => {
                tracing::info!(
                    user_id,
                    role = role.as_str(),
                    by = %grant.email,
                    "User role changed"
                );
                Ok(user)
            }
            Err(RepoError::NotFound(_)) => Err(AppError::with_message(
                ErrorCode::UserNotFound,
                format!("User {user_id} not found"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn profile(&self, identity: &Identity) -> AppResult<UserProfile> {
        let grant = self.guard.authorize(identity, Operation::ViewProfile).await?;
        Ok(UserProfile {
            email: grant.email,
            role: grant.role,
        })
    }
}
