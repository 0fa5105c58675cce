//! Shared domain types and the error taxonomy for the Saldo service.

pub mod error;
pub mod types;
