//! Repository for the `sessions` table (the session registry).

use saldo_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::Session;

const COLUMNS: &str = "invalidate_id, user_id, created_at, expires_at, last_used";

/// Provides operations on the session registry.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a session row for a freshly issued token pair.
    pub async fn create(
        pool: &PgPool,
        invalidate_id: &str,
        user_id: DbId,
        expires_at: Timestamp,
    ) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (invalidate_id, user_id, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(invalidate_id)
            .bind(user_id)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Look up a live session by its invalidation id.
    pub async fn find(
        pool: &PgPool,
        invalidate_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE invalidate_id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(invalidate_id)
            .fetch_optional(pool)
            .await
    }

    /// Update the session's `last_used` timestamp.
    pub async fn touch(pool: &PgPool, invalidate_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET last_used = now() WHERE invalidate_id = $1")
            .bind(invalidate_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a session row, revoking both tokens of its pair.
    ///
    /// Idempotent: deleting a row that is already gone is not an error.
    pub async fn delete(pool: &PgPool, invalidate_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE invalidate_id = $1")
            .bind(invalidate_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete every session whose expiry is at or before `now`.
    ///
    /// Rows with a future `expires_at` are untouched; a row expiring exactly
    /// at `now` is removed.
    pub async fn delete_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
