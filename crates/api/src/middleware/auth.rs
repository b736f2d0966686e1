//! Bearer token extractors.
//!
//! Handlers take the principal as an argument; there is no ambient
//! "current user".
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireWriter(ctx): RequireWriter) -> impl IntoResponse {
//!     format!("Hello, {}!", ctx.nombre)
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use crate::db::TokenRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::RequestContext;
use crate::services::hash_token;
use crate::state::AppState;

/// Extractor that requires a valid bearer token (any role).
pub struct RequireAuth(pub RequestContext);

/// Extractor that requires a token whose role may create or modify records.
pub struct RequireWriter(pub RequestContext);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_owned()))?;

        let ctx = TokenRepository::new(state.pool())
            .resolve(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or revoked token".to_owned()))?;

        Span::current().record("usuario_id", ctx.usuario_id.as_i32());
        set_sentry_user(ctx.usuario_id.as_i32(), &ctx.nombre);

        Ok(Self(ctx))
    }
}

impl FromRequestParts<AppState> for RequireWriter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(ctx) = RequireAuth::from_request_parts(parts, state).await?;

        if !ctx.can_write() {
            return Err(AppError::Forbidden(format!(
                "Role {} is read-only",
                ctx.rol
            )));
        }

        Ok(Self(ctx))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
