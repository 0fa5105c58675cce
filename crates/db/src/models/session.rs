//! Session registry model.

use saldo_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A session row from the `sessions` table.
///
/// One row backs both tokens of an issued access/refresh pair; the
/// `invalidate_id` embedded in each token is the primary key here, and
/// deleting the row revokes both tokens at once.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub invalidate_id: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
    /// Mirrors the refresh token's lifetime.
    pub expires_at: Timestamp,
    pub last_used: Timestamp,
}
