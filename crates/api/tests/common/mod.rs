#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use saldo_api::auth::jwt::JwtConfig;
use saldo_api::config::{ProcessorConfig, ServerConfig};
use saldo_api::payments::processor::{
    BinRule, CardInfo, PaymentMethodSpec, PaymentProcessor, ProcessorCreateRequest,
    ProcessorError, ProcessorPayment, QrData,
};
use saldo_api::router::build_app_router;
use saldo_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults: no OAuth providers, no
/// SMTP, one currency unit per credit.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        base_url: "http://localhost:8000".to_string(),
        credit_unit_value: 1.0,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 30,
        },
        processor: ProcessorConfig {
            base_url: "http://processor.invalid".to_string(),
            access_token: "test-token".to_string(),
            timeout_secs: 5,
        },
        google: None,
        facebook: None,
        smtp: None,
    }
}

// ---------------------------------------------------------------------------
// Scripted payment processor
// ---------------------------------------------------------------------------

struct MockState {
    next_id: u64,
    /// Status returned by `create_payment`.
    create_status: String,
    /// Known payments by processor id, as `get_payment` reports them.
    payments: HashMap<String, String>,
    fail_tokenize: bool,
    fail_create: bool,
    fail_get: bool,
}

/// In-memory [`PaymentProcessor`] double with scriptable outcomes.
pub struct MockProcessor {
    inner: Mutex<MockState>,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self {
            inner: Mutex::new(MockState {
                next_id: 1,
                create_status: "approved".to_string(),
                payments: HashMap::new(),
                fail_tokenize: false,
                fail_create: false,
                fail_get: false,
            }),
        }
    }
}

impl MockProcessor {
    /// Status that subsequent `create_payment` calls report.
    pub fn set_create_status(&self, status: &str) {
        self.inner.lock().unwrap().create_status = status.to_string();
    }

    /// Script the canonical status `get_payment` returns for one id.
    pub fn set_payment_status(&self, processor_id: &str, status: &str) {
        self.inner
            .lock()
            .unwrap()
            .payments
            .insert(processor_id.to_string(), status.to_string());
    }

    pub fn fail_tokenize(&self) {
        self.inner.lock().unwrap().fail_tokenize = true;
    }

    pub fn fail_create(&self) {
        self.inner.lock().unwrap().fail_create = true;
    }

    pub fn fail_get(&self) {
        self.inner.lock().unwrap().fail_get = true;
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethodSpec>, ProcessorError> {
        // A small catalog in the shape the real processor publishes:
        // visa for 4xx cards, master for 5xx cards, and a non-card method
        // that must never match.
        Ok(vec![
            PaymentMethodSpec {
                id: "visa".to_string(),
                payment_type_id: "credit_card".to_string(),
                bin_rules: vec![BinRule {
                    pattern: Some("^4".to_string()),
                    exclusion_pattern: None,
                }],
            },
            PaymentMethodSpec {
                id: "master".to_string(),
                payment_type_id: "credit_card".to_string(),
                bin_rules: vec![BinRule {
                    pattern: Some("^5".to_string()),
                    exclusion_pattern: None,
                }],
            },
            PaymentMethodSpec {
                id: "pix".to_string(),
                payment_type_id: "bank_transfer".to_string(),
                bin_rules: vec![],
            },
        ])
    }

    async fn tokenize_card(&self, _card: &CardInfo) -> Result<String, ProcessorError> {
        if self.inner.lock().unwrap().fail_tokenize {
            return Err(ProcessorError::Api {
                status: 400,
                message: "invalid card".to_string(),
            });
        }
        Ok("tok-test".to_string())
    }

    async fn create_payment(
        &self,
        request: &ProcessorCreateRequest,
    ) -> Result<ProcessorPayment, ProcessorError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_create {
            return Err(ProcessorError::Api {
                status: 400,
                message: "rejected by processor".to_string(),
            });
        }
        let id = format!("mp-{}", state.next_id);
        state.next_id += 1;
        let status = state.create_status.clone();
        state.payments.insert(id.clone(), status.clone());

        let qr = (request.payment_method_id == "pix").then(|| QrData {
            qr_code: "00020126pix".to_string(),
            qr_code_base64: "cXItY29kZQ==".to_string(),
            ticket_url: format!("http://processor.invalid/ticket/{id}"),
        });

        Ok(ProcessorPayment { id, status, qr })
    }

    async fn get_payment(&self, id: &str) -> Result<ProcessorPayment, ProcessorError> {
        let state = self.inner.lock().unwrap();
        if state.fail_get {
            return Err(ProcessorError::Network("connection refused".to_string()));
        }
        let status = state
            .payments
            .get(id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                message: format!("payment {id} not found"),
            })?;
        Ok(ProcessorPayment {
            id: id.to_string(),
            status,
            qr: None,
        })
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with the given scripted processor.
///
/// This goes through [`build_app_router`] so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_test_app_with(pool: PgPool, processor: Arc<MockProcessor>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        processor,
        providers: Arc::new(HashMap::new()),
        mailer: None,
    };
    build_app_router(state, &config)
}

/// Build the router with a fresh default-scripted processor.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, Arc::new(MockProcessor::default()))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Register a user through the API and return the register response JSON
/// (`access_token`, `refresh_token`, `user`).
pub async fn register_user(pool: PgPool, email: &str, password: &str) -> serde_json::Value {
    let app = build_test_app(pool);
    let body = serde_json::json!({ "email": email, "password": password });
    let response = post_json(app, "/api/v1/auth/register", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}
