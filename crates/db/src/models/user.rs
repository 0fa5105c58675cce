//! User identity model and DTOs.

use saldo_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A user row from the `users` table.
///
/// `password_hash` is `None` for accounts created through federated login
/// that never set a local password. Missing-field defaults (credits,
/// flags) live in the schema, not in read-time lookups.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub credits: f64,
    pub email_verified: bool,
    pub terms_accepted: bool,
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a new user.
///
/// Federated signup sets the matching provider subject id at insert time so
/// a user is never created half-linked.
#[derive(Default)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
}
