//! The session manager: issue, validate, refresh, and invalidate token pairs
//! backed by the server-side session registry.

use jsonwebtoken::errors::ErrorKind;
use saldo_core::error::CoreError;
use saldo_core::types::DbId;
use saldo_db::models::user::User;
use saldo_db::repositories::{SessionRepo, UserRepo};
use saldo_db::DbPool;
use uuid::Uuid;

use crate::auth::jwt::{
    decode_token, generate_access_token, generate_refresh_token, Claims, JwtConfig, TokenKind,
};
use crate::error::AppResult;

/// A freshly issued access/refresh pair. Both embed the same invalidation id.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue a new token pair for the user and persist its backing session row.
///
/// The session's `expires_at` mirrors the refresh token's lifetime, so the
/// expiry sweep removes the row exactly when the longer-lived token dies.
pub async fn issue(
    pool: &DbPool,
    config: &JwtConfig,
    user_id: DbId,
    email: &str,
) -> AppResult<TokenPair> {
    let invalidate_id = Uuid::new_v4().to_string();

    let access_token = generate_access_token(user_id, email, &invalidate_id, config)
        .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;
    let (refresh_token, refresh_expires) = generate_refresh_token(user_id, &invalidate_id, config)
        .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;

    SessionRepo::create(pool, &invalidate_id, user_id, refresh_expires).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validate a token of the expected kind against the session registry.
///
/// Failure taxonomy:
/// - [`CoreError::Expired`] -- signature valid but past `exp`;
/// - [`CoreError::InvalidToken`] -- integrity/structure failure or type-tag
///   mismatch;
/// - [`CoreError::RevokedSession`] -- token is sound but its session row is
///   gone (logout or expiry sweep).
///
/// On success the session's `last_used` is touched on a detached task;
/// a failed touch is logged and never fails the call.
pub async fn validate(
    pool: &DbPool,
    config: &JwtConfig,
    token: &str,
    expected: TokenKind,
) -> AppResult<Claims> {
    let claims = decode_token(token, config).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => CoreError::Expired,
        _ => CoreError::InvalidToken(e.to_string()),
    })?;

    if claims.kind != expected {
        return Err(CoreError::InvalidToken("Unexpected token type".into()).into());
    }

    SessionRepo::find(pool, &claims.invalidate_id)
        .await?
        .ok_or(CoreError::RevokedSession)?;

    // Fire-and-forget: the touch must never block or fail the caller.
    let touch_pool = pool.clone();
    let invalidate_id = claims.invalidate_id.clone();
    tokio::spawn(async move {
        if let Err(e) = SessionRepo::touch(&touch_pool, &invalidate_id).await {
            tracing::debug!(error = %e, "Session last_used touch failed");
        }
    });

    Ok(claims)
}

/// Exchange a refresh token for a new access token.
///
/// The new access token reuses the refresh token's invalidation id, so the
/// pair stays bound to one session row; the refresh token itself is not
/// rotated. Fails with [`CoreError::UserNotFound`] if the owning user has
/// been deleted since issuance.
pub async fn refresh(pool: &DbPool, config: &JwtConfig, refresh_token: &str) -> AppResult<(String, User)> {
    let claims = validate(pool, config, refresh_token, TokenKind::Refresh).await?;

    let user = UserRepo::find_by_id(pool, claims.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    let access_token = generate_access_token(user.id, &user.email, &claims.invalidate_id, config)
        .map_err(|e| CoreError::Internal(format!("Token generation error: {e}")))?;

    Ok((access_token, user))
}

/// Revoke the session behind a token pair. Idempotent.
pub async fn invalidate(pool: &DbPool, invalidate_id: &str) -> AppResult<()> {
    SessionRepo::delete(pool, invalidate_id).await?;
    Ok(())
}
