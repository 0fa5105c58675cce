//! HS256 token encoding for the paired access/refresh scheme.
//!
//! Both tokens of a pair are signed JWTs embedding the same `invalidate_id`,
//! which keys the server-side session registry. A token is therefore only as
//! alive as its session row: deleting the row revokes the pair no matter how
//! much signature lifetime remains.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use saldo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// Discriminates the two halves of a token pair. An endpoint expecting one
/// kind must reject the other even when the signature is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Owning user's internal database id.
    pub user_id: DbId,
    /// Subject: the user's email. Access tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Token type tag.
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Session registry key shared by both tokens of the pair.
    pub invalidate_id: String,
}

/// Configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 60).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 30).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 30;
/// Email-verification token lifetime in hours.
const EMAIL_TOKEN_EXPIRY_HOURS: i64 = 24;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `60`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }
}

/// Generate a short-lived access token embedding the given invalidation id.
pub fn generate_access_token(
    user_id: DbId,
    email: &str,
    invalidate_id: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = Utc::now().timestamp() + config.access_token_expiry_mins * 60;
    let claims = Claims {
        user_id,
        sub: Some(email.to_string()),
        exp,
        kind: TokenKind::Access,
        invalidate_id: invalidate_id.to_string(),
    };
    encode_claims(&claims, config)
}

/// Generate a long-lived refresh token embedding the given invalidation id.
///
/// Returns the token together with its expiry, which the caller persists on
/// the backing session row.
pub fn generate_refresh_token(
    user_id: DbId,
    invalidate_id: &str,
    config: &JwtConfig,
) -> Result<(String, Timestamp), jsonwebtoken::errors::Error> {
    let expires_at = Utc::now() + chrono::Duration::days(config.refresh_token_expiry_days);
    let claims = Claims {
        user_id,
        sub: None,
        exp: expires_at.timestamp(),
        kind: TokenKind::Refresh,
        invalidate_id: invalidate_id.to_string(),
    };
    Ok((encode_claims(&claims, config)?, expires_at))
}

fn encode_claims(claims: &Claims, config: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(), // HS256
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Decode and integrity-check a token, returning its [`Claims`].
///
/// Signature and `exp` are validated; type-tag and session checks are the
/// caller's job (see [`crate::auth::session::validate`]).
pub fn decode_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Claims of the standalone email-verification token.
#[derive(Debug, Serialize, Deserialize)]
struct EmailClaims {
    email: String,
    exp: i64,
}

/// Generate a 24-hour token proving control of `email`.
pub fn generate_email_token(
    email: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = EmailClaims {
        email: email.to_string(),
        exp: Utc::now().timestamp() + EMAIL_TOKEN_EXPIRY_HOURS * 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify an email-verification token and return the email it attests.
pub fn verify_email_token(token: &str, config: &JwtConfig) -> Option<String> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<EmailClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims.email)
    .ok()
}
