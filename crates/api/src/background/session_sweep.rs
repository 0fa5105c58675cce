//! Hourly sweep of expired session rows.
//!
//! Sessions outlive their tokens only until this sweep runs: a row whose
//! `expires_at` is at or before now is deleted, revoking whatever remains
//! of its token pair. Runs on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use chrono::Utc;
use saldo_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Pause before retrying after a failed delete.
const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Run the session expiry sweep loop until `cancel` is triggered.
///
/// A failed delete is logged and retried after [`ERROR_BACKOFF`]; the loop
/// itself never terminates on error.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Session expiry sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                if !sweep_with_retry(&pool, &cancel).await {
                    break;
                }
            }
        }
    }
}

/// One sweep, retried on failure until it succeeds or `cancel` fires.
/// Returns `false` when cancelled mid-retry.
async fn sweep_with_retry(pool: &PgPool, cancel: &CancellationToken) -> bool {
    loop {
        match SessionRepo::delete_expired(pool, Utc::now()).await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, "Session sweep: removed expired sessions");
                } else {
                    tracing::debug!("Session sweep: nothing to remove");
                }
                return true;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backoff_secs = ERROR_BACKOFF.as_secs(),
                    "Session sweep failed, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return false,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
    }
}
