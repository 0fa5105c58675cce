//! Facebook OAuth 2.0 provider (Graph API).
//!
//! Facebook does not attest email verification through the Graph `/me`
//! endpoint, so `email_verified` is always `false`: a Facebook login can
//! create a fresh account but never silently link to an existing one.

use async_trait::async_trait;
use saldo_core::error::CoreError;
use serde::Deserialize;

use super::{IdentityClaims, IdentityProvider};
use crate::config::OAuthAppConfig;

const AUTH_URL: &str = "https://www.facebook.com/v12.0/dialog/oauth";
const TOKEN_URL: &str = "https://graph.facebook.com/v12.0/oauth/access_token";
const USERINFO_URL: &str = "https://graph.facebook.com/me";

pub struct FacebookProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    id: String,
    name: String,
    email: Option<String>,
}

impl FacebookProvider {
    pub fn new(config: &OAuthAppConfig, http: reqwest::Client) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http,
        }
    }
}

#[async_trait]
impl IdentityProvider for FacebookProvider {
    fn name(&self) -> &'static str {
        "facebook"
    }

    fn build_auth_url(&self, redirect_uri: &str) -> String {
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", "email,public_profile"),
                ("response_type", "code"),
            ],
        )
        .expect("static auth URL must parse");
        url.to_string()
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, CoreError> {
        let response = self
            .http
            .get(TOKEN_URL)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| CoreError::FederationFailed(format!("Failed to retrieve token: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::FederationFailed(format!(
                "Failed to retrieve token: HTTP {}",
                response.status()
            )));
        }

        let body: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| CoreError::FederationFailed(format!("Malformed token response: {e}")))?;
        Ok(body.access_token)
    }

    async fn fetch_claims(&self, access_token: &str) -> Result<IdentityClaims, CoreError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .query(&[("fields", "id,name,email"), ("access_token", access_token)])
            .send()
            .await
            .map_err(|e| {
                CoreError::FederationFailed(format!("Failed to retrieve user info: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(CoreError::FederationFailed(format!(
                "Failed to retrieve user info: HTTP {}",
                response.status()
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| CoreError::FederationFailed(format!("Malformed user info: {e}")))?;

        let email = info.email.ok_or_else(|| {
            CoreError::FederationFailed("Provider returned no email for this identity".into())
        })?;

        Ok(IdentityClaims {
            subject: info.id,
            email,
            name: info.name,
            email_verified: false,
        })
    }
}
