//! Mercado Pago REST client implementing [`PaymentProcessor`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::processor::{
    BinRule, CardInfo, PaymentMethodSpec, PaymentProcessor, ProcessorCreateRequest,
    ProcessorError, ProcessorPayment, QrData,
};
use crate::config::ProcessorConfig;

pub struct MercadoPagoProcessor {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoProcessor {
    /// Build the client. Panics only on reqwest builder misconfiguration,
    /// which is a startup-time programming error.
    pub fn new(config: &ProcessorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build processor HTTP client");
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Convert a response into `T`, mapping non-2xx statuses to
    /// [`ProcessorError::Api`] with the body as the message.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProcessorError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ProcessorError::Network(format!("malformed response body: {e}")))
    }
}

// --- Wire formats -----------------------------------------------------------

#[derive(Deserialize)]
struct WireMethod {
    id: String,
    payment_type_id: String,
    #[serde(default)]
    settings: Vec<WireSetting>,
}

#[derive(Deserialize)]
struct WireSetting {
    #[serde(default)]
    bin: Option<WireBin>,
}

#[derive(Deserialize)]
struct WireBin {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    exclusion_pattern: Option<String>,
}

#[derive(Deserialize)]
struct WireCardToken {
    id: String,
}

#[derive(Deserialize)]
struct WirePayment {
    id: serde_json::Number,
    status: String,
    #[serde(default)]
    point_of_interaction: Option<WirePoi>,
}

#[derive(Deserialize)]
struct WirePoi {
    #[serde(default)]
    transaction_data: Option<WireTransactionData>,
}

#[derive(Deserialize)]
struct WireTransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
    #[serde(default)]
    ticket_url: Option<String>,
}

impl From<WirePayment> for ProcessorPayment {
    fn from(wire: WirePayment) -> Self {
        let qr = wire
            .point_of_interaction
            .and_then(|poi| poi.transaction_data)
            .and_then(|td| {
                Some(QrData {
                    qr_code: td.qr_code?,
                    qr_code_base64: td.qr_code_base64?,
                    ticket_url: td.ticket_url?,
                })
            });
        ProcessorPayment {
            id: wire.id.to_string(),
            status: wire.status,
            qr,
        }
    }
}

// --- Trait impl -------------------------------------------------------------

#[async_trait]
impl PaymentProcessor for MercadoPagoProcessor {
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethodSpec>, ProcessorError> {
        let response = self
            .http
            .get(self.url("/v1/payment_methods"))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ProcessorError::Network(e.to_string()))?;

        let methods: Vec<WireMethod> = Self::read_json(response).await?;
        Ok(methods
            .into_iter()
            .map(|m| PaymentMethodSpec {
                id: m.id,
                payment_type_id: m.payment_type_id,
                bin_rules: m
                    .settings
                    .into_iter()
                    .filter_map(|s| s.bin)
                    .map(|b| BinRule {
                        pattern: b.pattern,
                        exclusion_pattern: b.exclusion_pattern,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn tokenize_card(&self, card: &CardInfo) -> Result<String, ProcessorError> {
        let body = json!({
            "card_number": card.card_number,
            "expiration_month": card.expiration_month,
            "expiration_year": card.expiration_year,
            "security_code": card.security_code,
            "cardholder": { "name": card.cardholder_name },
        });

        let response = self
            .http
            .post(self.url("/v1/card_tokens"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProcessorError::Network(e.to_string()))?;

        let token: WireCardToken = Self::read_json(response).await?;
        Ok(token.id)
    }

    async fn create_payment(
        &self,
        request: &ProcessorCreateRequest,
    ) -> Result<ProcessorPayment, ProcessorError> {
        let mut body = json!({
            "transaction_amount": request.amount,
            "description": request.description,
            "payment_method_id": request.payment_method_id,
            "payer": { "email": request.payer_email },
        });
        if let Some(token) = &request.card_token {
            body["token"] = json!(token);
        }
        if let Some(installments) = request.installments {
            body["installments"] = json!(installments);
        }

        let response = self
            .http
            .post(self.url("/v1/payments"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProcessorError::Network(e.to_string()))?;

        let payment: WirePayment = Self::read_json(response).await?;
        Ok(payment.into())
    }

    async fn get_payment(&self, id: &str) -> Result<ProcessorPayment, ProcessorError> {
        let response = self
            .http
            .get(self.url(&format!("/v1/payments/{id}")))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ProcessorError::Network(e.to_string()))?;

        let payment: WirePayment = Self::read_json(response).await?;
        Ok(payment.into())
    }
}
