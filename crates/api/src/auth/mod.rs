//! Authentication primitives and the session manager.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- HS256 token pair encoding/decoding and email-verification tokens.
//! - [`session`] -- issue/validate/refresh/invalidate against the session registry.

pub mod jwt;
pub mod password;
pub mod session;
