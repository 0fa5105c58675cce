//! Payment ledger model and DTOs.

use saldo_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A payment row from the `payments` table.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: DbId,
    pub user_id: DbId,
    /// The external processor's payment id, assigned after creation.
    pub processor_id: Option<String>,
    /// Mirrors the processor's state; the ledger branches on `pending`,
    /// `approved`, and `failed`, other states pass through untouched.
    pub status: String,
    pub amount: f64,
    pub description: String,
    pub method: String,
    /// At-most-once guard for the balance credit.
    pub credits_added: bool,
    pub created_at: Timestamp,
}

/// DTO for inserting a new pending payment row.
pub struct CreatePayment {
    pub user_id: DbId,
    pub amount: f64,
    pub description: String,
    pub method: String,
}
