//! Request handlers, grouped by resource.

pub mod auth;
pub mod federated;
pub mod payments;
pub mod profile;
