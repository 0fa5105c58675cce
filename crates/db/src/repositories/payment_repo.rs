//! Repository for the `payments` table (the credit ledger).

use saldo_core::types::DbId;
use sqlx::PgPool;

use crate::models::payment::{CreatePayment, Payment};

const COLUMNS: &str = "id, user_id, processor_id, status, amount, description, method, \
                        credits_added, created_at";

/// Provides operations on payment rows and the at-most-once credit rule.
pub struct PaymentRepo;

impl PaymentRepo {
    /// Insert a `pending` row. Called *before* the processor request so a
    /// local record exists even if the network call never returns.
    pub async fn create(pool: &PgPool, input: &CreatePayment) -> Result<Payment, sqlx::Error> {
        let query = format!(
            "INSERT INTO payments (user_id, amount, description, method)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(input.user_id)
            .bind(input.amount)
            .bind(&input.description)
            .bind(&input.method)
            .fetch_one(pool)
            .await
    }

    /// Record the processor-assigned id and reported status after a
    /// successful create call.
    pub async fn record_processor_result(
        pool: &PgPool,
        id: DbId,
        processor_id: &str,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET processor_id = $2, status = $3 WHERE id = $1")
            .bind(id)
            .bind(processor_id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a local row `failed` when the processor rejects the payment.
    pub async fn mark_failed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET status = 'failed' WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mirror a non-approved processor status onto the local row.
    pub async fn set_status_by_processor_id(
        pool: &PgPool,
        processor_id: &str,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET status = $2 WHERE processor_id = $1")
            .bind(processor_id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_processor_id(
        pool: &PgPool,
        processor_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE processor_id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(processor_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply the at-most-once credit rule for an approved payment.
    ///
    /// A single conditional statement flips `credits_added` FALSE -> TRUE,
    /// marks the row `approved`, and increments the owner's balance by
    /// `amount / credit_unit_value`. The conditional UPDATE is itself the
    /// guard: two racing callers (synchronous create response vs. webhook)
    /// cannot both claim the row, so the balance moves exactly once.
    ///
    /// Returns the owner's new balance, or `None` when the payment is
    /// unknown or the credit was already applied.
    pub async fn apply_credit(
        pool: &PgPool,
        processor_id: &str,
        credit_unit_value: f64,
    ) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            "WITH claimed AS (
                 UPDATE payments
                 SET credits_added = TRUE, status = 'approved'
                 WHERE processor_id = $1 AND credits_added = FALSE
                 RETURNING user_id, amount
             )
             UPDATE users u
             SET credits = u.credits + c.amount / $2
             FROM claimed c
             WHERE u.id = c.user_id
             RETURNING u.credits",
        )
        .bind(processor_id)
        .bind(credit_unit_value)
        .fetch_optional(pool)
        .await
    }

    /// Page of a user's payments in insertion order, optionally filtered by
    /// processor id.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        processor_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM payments
             WHERE user_id = $1 AND ($2::text IS NULL OR processor_id = $2)
             ORDER BY id
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Payment>(&query)
            .bind(user_id)
            .bind(processor_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count of a user's payments matching the same filter as
    /// [`Self::list_for_user`].
    pub async fn count_for_user(
        pool: &PgPool,
        user_id: DbId,
        processor_id: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payments
             WHERE user_id = $1 AND ($2::text IS NULL OR processor_id = $2)",
        )
        .bind(user_id)
        .bind(processor_id)
        .fetch_one(pool)
        .await
    }
}
