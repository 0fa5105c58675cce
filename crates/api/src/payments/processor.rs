//! The external payment processor boundary.
//!
//! Everything the ledger needs from the processor sits behind
//! [`PaymentProcessor`] so tests can substitute a scripted double and the
//! production client stays a thin HTTP shim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw card fields submitted for tokenization. Never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CardInfo {
    pub card_number: String,
    pub expiration_month: u32,
    pub expiration_year: u32,
    pub security_code: String,
    pub cardholder_name: String,
}

/// One BIN rule published by the processor for a payment method.
#[derive(Debug, Clone, Default)]
pub struct BinRule {
    /// Prefix pattern a card number must match.
    pub pattern: Option<String>,
    /// Prefix pattern that disqualifies a card even when `pattern` matches.
    pub exclusion_pattern: Option<String>,
}

/// A payment method the processor supports, with its BIN routing rules.
#[derive(Debug, Clone)]
pub struct PaymentMethodSpec {
    pub id: String,
    /// Method class, e.g. `credit_card`.
    pub payment_type_id: String,
    pub bin_rules: Vec<BinRule>,
}

/// Request to create a payment at the processor.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorCreateRequest {
    pub amount: f64,
    pub description: String,
    pub payment_method_id: String,
    pub payer_email: String,
    /// Card token from a prior tokenization; card payments only.
    pub card_token: Option<String>,
    pub installments: Option<u32>,
}

/// Pix QR payload returned for pix payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrData {
    pub qr_code: String,
    pub qr_code_base64: String,
    pub ticket_url: String,
}

/// A payment as the processor reports it.
#[derive(Debug, Clone)]
pub struct ProcessorPayment {
    /// Processor-assigned id; the key for webhook reconciliation.
    pub id: String,
    /// Processor state (`pending`, `approved`, `rejected`, ...).
    pub status: String,
    pub qr: Option<QrData>,
}

/// Failure at the processor boundary, split by retryability: network
/// failures and 5xx responses are worth retrying, 4xx responses are final.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("processor request failed: {0}")]
    Network(String),

    #[error("processor returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ProcessorError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessorError::Network(_) => true,
            ProcessorError::Api { status, .. } => *status >= 500,
        }
    }
}

/// The processor operations the ledger depends on.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Published payment methods with their BIN routing rules.
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethodSpec>, ProcessorError>;

    /// Exchange raw card fields for a single-use card token.
    async fn tokenize_card(&self, card: &CardInfo) -> Result<String, ProcessorError>;

    /// Create a payment; the returned status may already be `approved`.
    async fn create_payment(
        &self,
        request: &ProcessorCreateRequest,
    ) -> Result<ProcessorPayment, ProcessorError>;

    /// Fetch the canonical state of a payment by processor id.
    async fn get_payment(&self, id: &str) -> Result<ProcessorPayment, ProcessorError>;
}
