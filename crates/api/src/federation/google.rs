//! Google OAuth 2.0 provider.
//!
//! Exchanges the authorization code for an `id_token` and verifies it via
//! Google's tokeninfo endpoint, checking issuer and audience. Google only
//! issues id tokens for verified addresses, but the `email_verified` claim
//! is still read rather than assumed.

use async_trait::async_trait;
use saldo_core::error::CoreError;
use serde::Deserialize;

use super::{IdentityClaims, IdentityProvider};
use crate::config::OAuthAppConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";

const VALID_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    sub: String,
    email: String,
    #[serde(default)]
    email_verified: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: &OAuthAppConfig, http: reqwest::Client) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            http,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn build_auth_url(&self, redirect_uri: &str) -> String {
        // Infallible: the base URL is a constant.
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("redirect_uri", redirect_uri),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .expect("static auth URL must parse");
        url.to_string()
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, CoreError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
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
        Ok(body.id_token)
    }

    async fn fetch_claims(&self, id_token: &str) -> Result<IdentityClaims, CoreError> {
        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| CoreError::FederationFailed(format!("Token verification failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CoreError::FederationFailed(format!(
                "Invalid token: HTTP {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| CoreError::FederationFailed(format!("Malformed tokeninfo: {e}")))?;

        if !VALID_ISSUERS.contains(&info.iss.as_str()) {
            return Err(CoreError::FederationFailed("Wrong issuer".into()));
        }
        if info.aud != self.client_id {
            return Err(CoreError::FederationFailed("Audience mismatch".into()));
        }

        Ok(IdentityClaims {
            subject: info.sub,
            email: info.email,
            name: info.name.unwrap_or_default(),
            // tokeninfo serializes booleans as strings
            email_verified: info.email_verified.as_deref() == Some("true"),
        })
    }
}
