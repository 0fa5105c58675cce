//! Repository for the `users` table.

use saldo_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, username, password_hash, credits, email_verified, \
                        terms_accepted, google_id, facebook_id, created_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, username, password_hash, email_verified, google_id, facebook_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.email_verified)
            .bind(&input.google_id)
            .bind(&input.facebook_id)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (unique).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Replace the user's password hash.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set the email-verified flag for the user with the given email.
    ///
    /// Returns `false` if no such user exists.
    pub async fn mark_email_verified(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record terms acceptance.
    pub async fn accept_terms(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET terms_accepted = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Attach an external provider's subject id to an existing user.
    ///
    /// `provider` must be one of `google` or `facebook`.
    pub async fn link_provider(
        pool: &PgPool,
        id: DbId,
        provider: &str,
        subject: &str,
    ) -> Result<(), sqlx::Error> {
        let query = match provider {
            "google" => "UPDATE users SET google_id = $2 WHERE id = $1",
            "facebook" => "UPDATE users SET facebook_id = $2 WHERE id = $1",
            other => {
                return Err(sqlx::Error::Protocol(format!(
                    "unknown identity provider: {other}"
                )))
            }
        };
        sqlx::query(query).bind(id).bind(subject).execute(pool).await?;
        Ok(())
    }
}
