//! Route definitions for the `/payments` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /          -> create_payment (requires auth)
/// GET  /          -> list_payments (requires auth)
/// POST /webhook   -> processor webhook (public)
/// GET  /credits   -> credit balance (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(payments::create_payment).get(payments::list_payments))
        .route("/webhook", post(payments::webhook))
        .route("/credits", get(payments::credits))
}
