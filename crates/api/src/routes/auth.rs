//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{auth, federated};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register              -> register
/// POST /login                 -> login
/// POST /refresh               -> refresh
/// POST /logout                -> logout (requires auth)
/// GET  /verify-email          -> verify_email
/// POST /change-password       -> change_password (requires auth)
/// POST /accept-terms          -> accept_terms (requires auth)
/// GET  /{provider}/url        -> federated auth URL
/// POST /{provider}/callback   -> federated code exchange
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/verify-email", get(auth::verify_email))
        .route("/change-password", post(auth::change_password))
        .route("/accept-terms", post(auth::accept_terms))
        .route("/{provider}/url", get(federated::auth_url))
        .route("/{provider}/callback", post(federated::callback))
}
