//! Identity Resolver
//!
//! Turns an `Authorization` header into a verified [`Identity`] and looks up the
//! caller's role in the record store. Nothing from the credential other than
//! the email is trusted.

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::{AppError, AppResult};
use shared::models::Role;
use shared::util::normalize_email;
use thiserror::Error;

use super::jwt::{JwtError, JwtService};
use crate::db::RecordStore;
use crate::security_log;

/// What an identity provider vouches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
}

/// Identity provider failure
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("credential expired")]
    Expired,

    #[error("credential rejected: {0}")]
    Invalid(String),
}

/// External identity provider seam
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// HS256 bearer token provider
pub struct JwtIdentityProvider {
    jwt: JwtService,
}

impl JwtIdentityProvider {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let claims = self.jwt.validate_token(credential).map_err(|e| match e {
            JwtError::ExpiredToken => IdentityError::Expired,
            other => IdentityError::Invalid(other.to_string()),
        })?;

        if claims.email.trim().is_empty() {
            return Err(IdentityError::Invalid("token carries no email".into()));
        }

        Ok(VerifiedIdentity {
            email: claims.email,
        })
    }
}

/// Verified caller. The email is normalised (trimmed, lowercase).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: &str) -> Self {
        Self {
            email: normalize_email(email),
        }
    }
}

/// Resolves credentials to identities and identities to roles
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn RecordStore>) -> Self {
        Self { provider, store }
    }

    /// Resolve an `Authorization` header value.
    ///
    /// Missing header is `NotAuthenticated`; a header without a bearer token
    /// or a rejected token is `TokenInvalid`; an expired token is `TokenExpired`.
    pub async fn resolve(&self, authorization: Option<&str>) -> AppResult<Identity> {
        let Some(header) = authorization else {
            security_log!("WARN", "auth_missing", reason = "no authorization header");
            return Err(AppError::unauthorized());
        };

        let token = JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?;

        match self.provider.verify(token).await {
            Ok(verified) => Ok(Identity::new(&verified.email)),
            Err(IdentityError::Expired) => {
                security_log!("WARN", "auth_failed", error = "expired");
                Err(AppError::token_expired())
            }
            Err(IdentityError::Invalid(reason)) => {
                security_log!("WARN", "auth_failed", error = reason.as_str());
                Err(AppError::invalid_token("Invalid token"))
            }
        }
    }

    /// Current role for an email. No record means [`Role::User`].
    pub async fn role_of(&self, email: &str) -> AppResult<Role> {
        let user = self.store.find_user_by_email(&normalize_email(email)).await?;
        Ok(user.map(|u| u.role).unwrap_or_default())
    }
}
