//! Identity Extractor
//!
//! Handlers that take an [`Identity`] argument require a valid bearer token.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;

use crate::auth::Identity;
use crate::core::ServerState;

impl FromRequestParts<ServerState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(identity.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let identity = state.resolver.resolve(auth_header).await.inspect_err(|_| {
            tracing::debug!(uri = %parts.uri, "request rejected by identity resolver");
        })?;

        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}
