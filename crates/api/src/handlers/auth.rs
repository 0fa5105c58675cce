//! Handlers for the `/auth` resource (register, login, refresh, logout,
//! email verification, password change, terms acceptance).

use axum::extract::{Query, State};
use axum::http::header::{HeaderName, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::AppendHeaders;
use axum::Json;
use saldo_core::error::CoreError;
use saldo_core::types::DbId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use saldo_db::models::user::{CreateUser, User};
use saldo_db::repositories::UserRepo;

use crate::auth::jwt::{generate_email_token, verify_email_token, JwtConfig};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::session::{self, TokenPair};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{cookie_value, AuthUser};
use crate::state::AppState;

/// Cookie carrying the access token.
pub(crate) const ACCESS_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token.
pub(crate) const REFRESH_COOKIE: &str = "refresh_token";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    /// Display name; defaults to the email address.
    pub username: Option<String>,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`. The token may instead arrive in
/// the `refresh_token` cookie, in which case the body is `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for `POST /auth/change-password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Query for `GET /auth/verify-email`.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

/// Successful authentication response returned by register, login, and the
/// federated callback. The tokens are also set as HTTP-only cookies.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

/// Response for `POST /auth/refresh`: a fresh access token only, the
/// refresh token is not rotated.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserInfo,
}

/// Public user info embedded in authentication responses.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub username: String,
    pub credits: f64,
    pub email_verified: bool,
    pub terms_accepted: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            credits: user.credits,
            email_verified: user.email_verified,
            terms_accepted: user.terms_accepted,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a password-backed account and log it in. Returns 201 with a
/// token pair; a duplicate email surfaces as 409 via the unique constraint.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    // 1. Validate the request shape.
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;

    // 2. Hash the password and insert the row. The uq_users_email
    //    constraint turns a duplicate into a 409.
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email.clone(),
            username: input.username.unwrap_or_else(|| input.email.clone()),
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "User registered");

    // 3. Best-effort verification mail; registration never fails on it.
    send_verification_mail(&state, &user.email);

    // 4. Issue the token pair.
    let pair = session::issue(&state.pool, &state.config.jwt, user.id, &user.email).await?;

    Ok((
        StatusCode::CREATED,
        auth_cookie_headers(&pair, &state.config.jwt),
        Json(token_response(pair, &user)),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. The same 401 covers an unknown
/// email, a federated-only account, and a wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or(CoreError::InvalidCredentials)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(CoreError::InvalidCredentials)?;

    let password_valid = verify_password(&input.password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(CoreError::InvalidCredentials.into());
    }

    let pair = session::issue(&state.pool, &state.config.jwt, user.id, &user.email).await?;

    Ok((
        auth_cookie_headers(&pair, &state.config.jwt),
        Json(token_response(pair, &user)),
    ))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token (body field or cookie) for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    let token = input
        .refresh_token
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE))
        .ok_or(CoreError::Unauthenticated)?;

    let (access_token, user) = session::refresh(&state.pool, &state.config.jwt, &token).await?;

    let max_age = state.config.jwt.access_token_expiry_mins * 60;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie(ACCESS_COOKIE, &access_token, max_age))]),
        Json(RefreshResponse {
            access_token,
            token_type: "bearer",
            user: UserInfo::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/logout
///
/// Revoke the presented token's session and expire both cookies.
/// Returns 204 No Content; logging out twice is not an error.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl axum::response::IntoResponse> {
    session::invalidate(&state.pool, &auth_user.invalidate_id).await?;
    Ok((StatusCode::NO_CONTENT, clear_cookie_headers()))
}

/// GET /api/v1/auth/verify-email?token=...
///
/// Redeem a 24-hour email verification token.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let email = verify_email_token(&query.token, &state.config.jwt).ok_or_else(|| {
        CoreError::InvalidToken("Invalid or expired verification token".into())
    })?;

    if !UserRepo::mark_email_verified(&state.pool, &email).await? {
        return Err(CoreError::UserNotFound.into());
    }
    tracing::info!(email, "Email address verified");

    Ok(Json(serde_json::json!({ "message": "Email verified" })))
}

/// POST /api/v1/auth/change-password
///
/// Replace the password after verifying the current one.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(CoreError::InvalidCredentials)?;
    let current_valid = verify_password(&input.current_password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(CoreError::InvalidCredentials.into());
    }

    validate_password_strength(&input.new_password).map_err(CoreError::Validation)?;
    let new_hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &new_hash).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/accept-terms
pub async fn accept_terms(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<StatusCode> {
    UserRepo::accept_terms(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers shared with the federated callback
// ---------------------------------------------------------------------------

pub(crate) fn token_response(pair: TokenPair, user: &User) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer",
        user: UserInfo::from(user),
    }
}

/// `Set-Cookie` headers for a fresh token pair. Cookie lifetimes mirror the
/// token lifetimes.
pub(crate) fn auth_cookie_headers(
    pair: &TokenPair,
    jwt: &JwtConfig,
) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            cookie(
                ACCESS_COOKIE,
                &pair.access_token,
                jwt.access_token_expiry_mins * 60,
            ),
        ),
        (
            SET_COOKIE,
            cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                jwt.refresh_token_expiry_days * 86_400,
            ),
        ),
    ])
}

/// `Set-Cookie` headers that expire both token cookies.
pub(crate) fn clear_cookie_headers() -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (SET_COOKIE, cookie(ACCESS_COOKIE, "", 0)),
        (SET_COOKIE, cookie(REFRESH_COOKIE, "", 0)),
    ])
}

fn cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; Secure; SameSite=Lax")
}

/// Spawn the verification mail send so registration latency never depends
/// on the SMTP relay. Failures are logged and dropped.
fn send_verification_mail(state: &AppState, email: &str) {
    let Some(mailer) = state.mailer.clone() else {
        tracing::debug!("SMTP not configured, skipping verification mail");
        return;
    };

    let token = match generate_email_token(email, &state.config.jwt) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to generate email verification token");
            return;
        }
    };

    let verify_url = format!(
        "{}/api/v1/auth/verify-email?token={token}",
        state.config.base_url
    );
    let to_email = email.to_string();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_verification(&to_email, &verify_url).await {
            tracing::warn!(error = %e, "Verification email delivery failed");
        }
    });
}
