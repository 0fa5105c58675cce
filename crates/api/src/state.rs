use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::federation::IdentityProvider;
use crate::mail::Mailer;
use crate::payments::processor::PaymentProcessor;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). All external
/// collaborators sit behind traits so tests can substitute them.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: saldo_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// External payment processor client.
    pub processor: Arc<dyn PaymentProcessor>,
    /// Identity providers keyed by name (`google`, `facebook`).
    pub providers: Arc<HashMap<&'static str, Arc<dyn IdentityProvider>>>,
    /// Outbound verification mail; `None` when SMTP is unconfigured.
    pub mailer: Option<Arc<Mailer>>,
}
