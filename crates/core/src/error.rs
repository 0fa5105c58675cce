use crate::types::DbId;

/// Domain-level error taxonomy.
///
/// Every variant maps to a client-visible failure in `saldo-api`; none are
/// silently swallowed except where a call site explicitly says so (the
/// session `last_used` touch, unknown webhook types, and sweep iterations).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// No credentials were presented at all.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A token's signature is valid but its `exp` has passed.
    #[error("Token has expired")]
    Expired,

    /// Integrity check failed, the token is structurally broken, or its
    /// type tag does not match the endpoint's expectation.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The token is cryptographically sound but its session row is gone.
    #[error("Session has been revoked")]
    RevokedSession,

    /// Email/password pair did not match a local account.
    #[error("Incorrect email or password")]
    InvalidCredentials,

    /// The user referenced by a token no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The processor rejected the card tokenization request.
    #[error("Card tokenization failed: {0}")]
    TokenizationFailed(String),

    /// No published BIN rule matched the card number.
    #[error("Unable to determine payment method")]
    UnresolvedPaymentMethod,

    /// The processor refused to create the payment.
    #[error("Payment creation failed: {0}")]
    PaymentRejected(String),

    /// OAuth code exchange or claim verification failed upstream.
    #[error("Federated login failed: {0}")]
    FederationFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
