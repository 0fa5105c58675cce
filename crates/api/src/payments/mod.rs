//! The payment ledger: processor boundary, BIN-based method resolution, and
//! the create/reconcile flows that feed the at-most-once credit rule.

pub mod ledger;
pub mod mercado_pago;
pub mod methods;
pub mod processor;
