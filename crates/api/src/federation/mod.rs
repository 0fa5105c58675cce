//! Identity federation: normalizing external OAuth identities into local
//! user records.
//!
//! Each provider implements [`IdentityProvider`]; the login policy in
//! [`resolve_user`] is provider-agnostic.

pub mod facebook;
pub mod google;

use async_trait::async_trait;
use saldo_core::error::CoreError;
use saldo_db::models::user::{CreateUser, User};
use saldo_db::repositories::UserRepo;
use saldo_db::DbPool;

use crate::error::AppResult;

/// Verified identity claims returned by a provider after code exchange.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    /// The provider's stable subject id for this identity.
    pub subject: String,
    pub email: String,
    /// Display name; used as the username for first-time signups.
    pub name: String,
    /// Whether the provider attests that it verified this email address.
    pub email_verified: bool,
}

/// An external OAuth identity provider.
///
/// The code exchange and claim verification are opaque: implementations own
/// the provider-specific endpoints and token formats and surface every
/// upstream failure as [`CoreError::FederationFailed`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Stable provider key (`google`, `facebook`); doubles as the column
    /// selector for the linked subject id.
    fn name(&self) -> &'static str;

    /// Build the provider's authorization URL for the given redirect target.
    fn build_auth_url(&self, redirect_uri: &str) -> String;

    /// Exchange an authorization code for a provider token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, CoreError>;

    /// Verify the provider token and fetch identity claims.
    async fn fetch_claims(&self, provider_token: &str) -> Result<IdentityClaims, CoreError>;
}

/// Map verified claims onto a local user record.
///
/// - No user with the claimed email: create one (zero credits, provider
///   subject linked, `email_verified` taken from the provider's guarantee).
///   Creation happens in a single insert; an upstream failure earlier in the
///   flow never leaves a partial user behind.
/// - Existing user already linked to this subject: log in.
/// - Existing user without a link: attach the subject, but only when the
///   provider attests the email as verified -- linking purely by email
///   equality from a weakly-verified provider is an account-takeover vector.
/// - Existing user linked to a *different* subject of the same provider:
///   refuse.
pub async fn resolve_user(
    pool: &DbPool,
    provider: &dyn IdentityProvider,
    claims: &IdentityClaims,
) -> AppResult<User> {
    let existing = UserRepo::find_by_email(pool, &claims.email).await?;

    let Some(user) = existing else {
        let input = CreateUser {
            email: claims.email.clone(),
            username: if claims.name.is_empty() {
                claims.email.clone()
            } else {
                claims.name.clone()
            },
            password_hash: None,
            email_verified: claims.email_verified,
            google_id: (provider.name() == "google").then(|| claims.subject.clone()),
            facebook_id: (provider.name() == "facebook").then(|| claims.subject.clone()),
        };
        let user = UserRepo::create(pool, &input).await?;
        tracing::info!(user_id = user.id, provider = provider.name(), "Federated signup");
        return Ok(user);
    };

    let linked = match provider.name() {
        "google" => user.google_id.as_deref(),
        "facebook" => user.facebook_id.as_deref(),
        _ => None,
    };

    match linked {
        Some(subject) if subject == claims.subject => Ok(user),
        Some(_) => Err(CoreError::FederationFailed(
            "Account is linked to a different identity at this provider".into(),
        )
        .into()),
        None => {
            if !claims.email_verified {
                return Err(CoreError::FederationFailed(
                    "Provider did not verify this email; cannot link to an existing account"
                        .into(),
                )
                .into());
            }
            UserRepo::link_provider(pool, user.id, provider.name(), &claims.subject).await?;
            tracing::info!(
                user_id = user.id,
                provider = provider.name(),
                "Linked provider identity to existing account"
            );
            Ok(user)
        }
    }
}
