//! Saldo API server library.
//!
//! Exposes the core building blocks (config, state, error handling, auth,
//! federation, payments, routes) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod federation;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod payments;
pub mod router;
pub mod routes;
pub mod state;
