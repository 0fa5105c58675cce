//! Handlers for the `/payments` resource: creation, webhook reconciliation,
//! listing, and the credit balance.

use axum::extract::{Query, State};
use axum::Json;
use saldo_core::error::CoreError;
use saldo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

use saldo_db::models::payment::Payment;
use saldo_db::repositories::{PaymentRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::payments::ledger::{self, NewPayment, NewPaymentMethod};
use crate::payments::processor::{CardInfo, QrData};
use crate::state::AppState;

/// Default page size for payment listings.
const DEFAULT_PAGE_SIZE: i64 = 20;
/// Upper bound on requested page size.
const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /payments`.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    /// `card` or `pix`.
    pub method: String,
    /// Raw card fields; required for `card`, forbidden to matter for `pix`.
    pub card: Option<CardInfo>,
    /// Card installment count (default 1).
    pub installments: Option<u32>,
}

/// Response body for a created payment.
#[derive(Debug, Serialize)]
pub struct PaymentCreatedResponse {
    /// Processor-assigned payment id.
    pub id: String,
    pub status: String,
    pub amount: f64,
    pub description: String,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<QrData>,
}

/// Processor webhook event envelope. Only the payment id is read; the
/// status is re-fetched from the processor.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    /// Processors send this as a number or a string depending on the event.
    pub id: serde_json::Value,
}

/// Query for `GET /payments`.
#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    /// Restrict to one payment by processor id.
    pub processor_id: Option<String>,
}

/// One page of a user's payments.
#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub items: Vec<PaymentItem>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentItem {
    pub id: DbId,
    pub processor_id: Option<String>,
    pub status: String,
    pub amount: f64,
    pub description: String,
    pub method: String,
    pub credits_added: bool,
    pub created_at: Timestamp,
}

impl From<Payment> for PaymentItem {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            processor_id: p.processor_id,
            status: p.status,
            amount: p.amount,
            description: p.description,
            method: p.method,
            credits_added: p.credits_added,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub credits: f64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/payments
pub async fn create_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<Json<PaymentCreatedResponse>> {
    // 1. Validate the request before anything leaves the process.
    if !(input.amount > 0.0) {
        return Err(CoreError::Validation("amount must be positive".into()).into());
    }
    let method = match input.method.as_str() {
        "pix" => NewPaymentMethod::Pix,
        "card" => {
            let card = input.card.ok_or_else(|| {
                CoreError::Validation("card payments require card details".into())
            })?;
            NewPaymentMethod::Card {
                card,
                installments: input.installments.unwrap_or(1),
            }
        }
        other => {
            return Err(
                CoreError::Validation(format!("unsupported payment method: {other}")).into(),
            )
        }
    };

    // 2. The ledger needs the full user row for the payer email.
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    // 3. Run the create flow (pending row, processor call, inline credit).
    let outcome = ledger::create_payment(
        &state,
        &user,
        NewPayment {
            amount: input.amount,
            description: input.description,
            method,
        },
    )
    .await?;

    Ok(Json(PaymentCreatedResponse {
        id: outcome.processor_id,
        status: outcome.status,
        amount: outcome.amount,
        description: outcome.description,
        method: outcome.method,
        qr: outcome.qr,
    }))
}

/// POST /api/v1/payments/webhook
///
/// Unauthenticated processor callback. Unknown event types are acknowledged
/// with 200 so the processor stops redelivering them; payment events are
/// reconciled against the processor's canonical state.
pub async fn webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> AppResult<Json<serde_json::Value>> {
    if event.kind != "payment" {
        tracing::debug!(kind = %event.kind, "Ignoring non-payment webhook event");
        return Ok(Json(serde_json::json!({ "status": "ignored" })));
    }

    let data = event
        .data
        .ok_or_else(|| AppError::BadRequest("payment event without data".into()))?;
    let processor_id = match &data.id {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(AppError::BadRequest("payment event with malformed id".into())),
    };

    ledger::reconcile_payment(&state, &processor_id).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// GET /api/v1/payments
pub async fn list_payments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> AppResult<Json<PaymentListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let size = query.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let processor_id = query.processor_id.as_deref();

    let total = PaymentRepo::count_for_user(&state.pool, auth_user.user_id, processor_id).await?;
    let items = PaymentRepo::list_for_user(
        &state.pool,
        auth_user.user_id,
        processor_id,
        size,
        (page - 1) * size,
    )
    .await?;

    Ok(Json(PaymentListResponse {
        items: items.into_iter().map(PaymentItem::from).collect(),
        total,
        page,
        size,
        pages: (total + size - 1) / size,
    }))
}

/// GET /api/v1/payments/credits
pub async fn credits(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<CreditsResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    Ok(Json(CreditsResponse {
        credits: user.credits,
    }))
}
