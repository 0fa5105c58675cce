//! Handlers for federated login (`/auth/{provider}/url`,
//! `/auth/{provider}/callback`).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::session;
use crate::error::{AppError, AppResult};
use crate::federation::{resolve_user, IdentityProvider};
use crate::handlers::auth::{auth_cookie_headers, token_response};
use crate::state::AppState;

/// Query for `GET /auth/{provider}/url`.
#[derive(Debug, Deserialize)]
pub struct AuthUrlQuery {
    /// Where the provider should send the user back to; defaults to this
    /// service's own callback endpoint.
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

/// Request body for `POST /auth/{provider}/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    /// Must match the redirect used when building the authorization URL.
    pub redirect_uri: Option<String>,
}

/// GET /api/v1/auth/{provider}/url
///
/// Build the provider's authorization URL for the client to redirect to.
pub async fn auth_url(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Query(query): Query<AuthUrlQuery>,
) -> AppResult<Json<AuthUrlResponse>> {
    let provider = lookup_provider(&state, &provider_name)?;
    let redirect_uri = query
        .redirect_uri
        .unwrap_or_else(|| default_redirect(&state, provider.name()));

    Ok(Json(AuthUrlResponse {
        auth_url: provider.build_auth_url(&redirect_uri),
    }))
}

/// POST /api/v1/auth/{provider}/callback
///
/// Complete the OAuth flow: exchange the code, verify the claims, map them
/// onto a local user, and issue a token pair.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider_name): Path<String>,
    Json(input): Json<CallbackRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    let provider = lookup_provider(&state, &provider_name)?;
    let redirect_uri = input
        .redirect_uri
        .unwrap_or_else(|| default_redirect(&state, provider.name()));

    // 1. Code -> provider token -> verified claims.
    let provider_token = provider.exchange_code(&input.code, &redirect_uri).await?;
    let claims = provider.fetch_claims(&provider_token).await?;

    // 2. Claims -> local user (create or link per policy).
    let user = resolve_user(&state.pool, provider.as_ref(), &claims).await?;

    // 3. Local session.
    let pair = session::issue(&state.pool, &state.config.jwt, user.id, &user.email).await?;
    tracing::info!(user_id = user.id, provider = provider.name(), "Federated login");

    Ok((
        auth_cookie_headers(&pair, &state.config.jwt),
        Json(token_response(pair, &user)),
    ))
}

fn lookup_provider(
    state: &AppState,
    name: &str,
) -> Result<Arc<dyn IdentityProvider>, AppError> {
    state
        .providers
        .get(name)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("Unknown identity provider: {name}")))
}

fn default_redirect(state: &AppState, provider: &str) -> String {
    format!(
        "{}/api/v1/auth/{provider}/callback",
        state.config.base_url
    )
}
