//! Handler for the authenticated user's profile.

use axum::extract::State;
use axum::Json;
use saldo_core::error::CoreError;
use saldo_core::types::{DbId, Timestamp};
use serde::Serialize;

use saldo_db::repositories::UserRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: DbId,
    pub email: String,
    pub username: String,
    pub credits: f64,
    pub email_verified: bool,
    pub terms_accepted: bool,
    /// Whether a local password is set (false for federated-only accounts).
    pub has_password: bool,
    pub google_linked: bool,
    pub facebook_linked: bool,
    pub created_at: Timestamp,
}

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        credits: user.credits,
        email_verified: user.email_verified,
        terms_accepted: user.terms_accepted,
        has_password: user.password_hash.is_some(),
        google_linked: user.google_id.is_some(),
        facebook_linked: user.facebook_id.is_some(),
        created_at: user.created_at,
    }))
}
