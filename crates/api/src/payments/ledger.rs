//! Payment creation and reconciliation flows.
//!
//! A payment's credit can be confirmed on two independent paths: the
//! synchronous create response and the asynchronous processor webhook,
//! arriving in any order and possibly concurrently. Both funnel into
//! [`PaymentRepo::apply_credit`], whose conditional update is the single
//! at-most-once gate.

use saldo_core::error::CoreError;
use saldo_db::models::payment::CreatePayment;
use saldo_db::models::user::User;
use saldo_db::repositories::PaymentRepo;

use super::methods::resolve_card_method;
use super::processor::{CardInfo, ProcessorCreateRequest, QrData};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Processor status signalling that the payment cleared.
pub const STATUS_APPROVED: &str = "approved";

/// A payment request after handler-level validation.
#[derive(Debug)]
pub struct NewPayment {
    pub amount: f64,
    pub description: String,
    pub method: NewPaymentMethod,
}

#[derive(Debug)]
pub enum NewPaymentMethod {
    Card { card: CardInfo, installments: u32 },
    Pix,
}

impl NewPaymentMethod {
    /// Label stored on the ledger row.
    pub fn label(&self) -> &'static str {
        match self {
            NewPaymentMethod::Card { .. } => "card",
            NewPaymentMethod::Pix => "pix",
        }
    }
}

/// Result of a successful creation, as returned to the client.
#[derive(Debug)]
pub struct PaymentOutcome {
    /// Processor-assigned payment id.
    pub processor_id: String,
    /// Status after creation (and after the inline credit, if any).
    pub status: String,
    pub amount: f64,
    pub description: String,
    pub method: &'static str,
    /// Pix QR payload, when the processor returned one.
    pub qr: Option<QrData>,
}

/// Create a payment for `user`.
///
/// Order matters here:
/// 1. Card-only preparation (tokenize, resolve BIN method) runs first, so a
///    rejected card never produces a ledger row.
/// 2. The local `pending` row is inserted *before* the processor call: if
///    the network call never returns, an auditable record still exists.
/// 3. A processor rejection marks the row `failed` and surfaces
///    [`CoreError::PaymentRejected`]; the row is never removed.
/// 4. If the synchronous response already reports `approved`, the credit
///    rule is applied inline.
pub async fn create_payment(
    state: &AppState,
    user: &User,
    input: NewPayment,
) -> AppResult<PaymentOutcome> {
    let method_label = input.method.label();

    let (payment_method_id, card_token, installments) = match &input.method {
        NewPaymentMethod::Pix => ("pix".to_string(), None, None),
        NewPaymentMethod::Card { card, installments } => {
            let token = state
                .processor
                .tokenize_card(card)
                .await
                .map_err(|e| CoreError::TokenizationFailed(e.to_string()))?;

            let methods = state
                .processor
                .list_payment_methods()
                .await
                .map_err(|e| AppError::Upstream(format!("payment method catalog: {e}")))?;
            let method_id = resolve_card_method(&methods, &card.card_number)?;

            (method_id, Some(token), Some(*installments))
        }
    };

    let row = PaymentRepo::create(
        &state.pool,
        &CreatePayment {
            user_id: user.id,
            amount: input.amount,
            description: input.description.clone(),
            method: method_label.to_string(),
        },
    )
    .await?;

    let request = ProcessorCreateRequest {
        amount: input.amount,
        description: input.description.clone(),
        payment_method_id,
        payer_email: user.email.clone(),
        card_token,
        installments,
    };

    let created = match state.processor.create_payment(&request).await {
        Ok(created) => created,
        Err(e) => {
            PaymentRepo::mark_failed(&state.pool, row.id).await?;
            tracing::warn!(payment_id = row.id, error = %e, "Processor rejected payment");
            return Err(CoreError::PaymentRejected(e.to_string()).into());
        }
    };

    PaymentRepo::record_processor_result(&state.pool, row.id, &created.id, &created.status)
        .await?;

    if created.status == STATUS_APPROVED {
        apply_credit(state, &created.id).await?;
    }

    Ok(PaymentOutcome {
        processor_id: created.id,
        status: created.status,
        amount: input.amount,
        description: input.description,
        method: method_label,
        qr: created.qr,
    })
}

/// Reconcile one processor webhook event.
///
/// The webhook body is never trusted beyond the payment id: the canonical
/// status is re-fetched from the processor. Replays are harmless -- the
/// credit gate makes the `approved` branch idempotent. A retryable fetch
/// failure propagates as 502 so the processor's at-least-once delivery
/// retries the event; a terminal one (e.g. an id the processor does not
/// know) is 400 so delivery stops.
pub async fn reconcile_payment(state: &AppState, processor_id: &str) -> AppResult<()> {
    let payment = match state.processor.get_payment(processor_id).await {
        Ok(payment) => payment,
        Err(e) if e.is_retryable() => {
            return Err(AppError::Upstream(format!("payment status fetch: {e}")))
        }
        Err(e) => {
            return Err(AppError::BadRequest(format!("payment status fetch: {e}")))
        }
    };

    if payment.status == STATUS_APPROVED {
        apply_credit(state, &payment.id).await?;
    } else {
        PaymentRepo::set_status_by_processor_id(&state.pool, &payment.id, &payment.status)
            .await?;
        tracing::debug!(
            processor_id = %payment.id,
            status = %payment.status,
            "Mirrored non-approved processor status"
        );
    }

    Ok(())
}

/// Apply the at-most-once credit rule and log the outcome.
async fn apply_credit(state: &AppState, processor_id: &str) -> AppResult<()> {
    match PaymentRepo::apply_credit(&state.pool, processor_id, state.config.credit_unit_value)
        .await?
    {
        Some(balance) => {
            tracing::info!(processor_id, balance, "Credits applied");
        }
        None => {
            tracing::debug!(processor_id, "Credit already applied or payment unknown");
        }
    }
    Ok(())
}
