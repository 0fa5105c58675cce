//! Authentication extractor for Axum handlers.
//!
//! Accepts the access token from the `access_token` HTTP-only cookie (the
//! browser transport) or an `Authorization: Bearer` header (API clients),
//! and validates it against the session registry -- a revoked session fails
//! here even if the token's own signature is still unexpired.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use saldo_core::error::CoreError;
use saldo_core::types::DbId;

use crate::auth::jwt::TokenKind;
use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a validated access token.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id.
    pub user_id: DbId,
    /// The user's email (the token's subject).
    pub email: String,
    /// Session registry key of the presented token's pair.
    pub invalidate_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(CoreError::Unauthenticated)?;

        let claims =
            session::validate(&state.pool, &state.config.jwt, &token, TokenKind::Access).await?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub.unwrap_or_default(),
            invalidate_id: claims.invalidate_id,
        })
    }
}

/// Pull the access token from the cookie or the `Authorization` header.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(token) = cookie_value(&parts.headers, "access_token") {
        return Some(token);
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Read one value out of the `Cookie` header.
pub(crate) fn cookie_value(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
