pub mod auth;
pub mod health;
pub mod payments;
pub mod profile;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                     register (public)
/// /auth/login                        login (public)
/// /auth/refresh                      refresh (public, token in body/cookie)
/// /auth/logout                       logout (requires auth)
/// /auth/verify-email                 redeem email token (public)
/// /auth/change-password              change password (requires auth)
/// /auth/accept-terms                 accept terms (requires auth)
/// /auth/{provider}/url               federated auth URL (public)
/// /auth/{provider}/callback          federated code exchange (public)
///
/// /payments                          create, list (requires auth)
/// /payments/webhook                  processor webhook (public)
/// /payments/credits                  current balance (requires auth)
///
/// /profile                           current user record (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/payments", payments::router())
        .nest("/profile", profile::router())
}
