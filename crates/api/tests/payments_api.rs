//! HTTP-level integration tests for the payment ledger: creation flows,
//! webhook reconciliation, the at-most-once credit rule, and listing.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json, post_json_auth, register_user, MockProcessor};
use sqlx::PgPool;

use saldo_db::models::payment::CreatePayment;
use saldo_db::repositories::{PaymentRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user_credits(pool: &PgPool, email: &str) -> f64 {
    UserRepo::find_by_email(pool, email)
        .await
        .unwrap()
        .unwrap()
        .credits
}

fn card_body(amount: f64, card_number: &str) -> serde_json::Value {
    serde_json::json!({
        "amount": amount,
        "description": "credits top-up",
        "method": "card",
        "card": {
            "card_number": card_number,
            "expiration_month": 12,
            "expiration_year": 2030,
            "security_code": "123",
            "cardholder_name": "Test Holder",
        },
        "installments": 1,
    })
}

// ---------------------------------------------------------------------------
// Creation flows
// ---------------------------------------------------------------------------

/// A pix payment approved synchronously credits the balance inline and
/// returns the QR payload.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_pix_payment_approved_inline(pool: PgPool) {
    let json = register_user(pool.clone(), "pix@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    let processor = Arc::new(MockProcessor::default()); // create_status approved
    let app = common::build_test_app_with(pool.clone(), Arc::clone(&processor));

    let body = serde_json::json!({ "amount": 25.0, "method": "pix" });
    let response = post_json_auth(app, "/api/v1/payments", body, token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "approved");
    assert_eq!(json["method"], "pix");
    assert!(json["qr"]["qr_code"].is_string());
    assert!(json["qr"]["ticket_url"].is_string());

    // 25.0 / credit_unit_value (1.0) credits applied exactly once.
    assert_eq!(user_credits(&pool, "pix@test.com").await, 25.0);

    let processor_id = json["id"].as_str().unwrap();
    let payment = PaymentRepo::find_by_processor_id(&pool, processor_id)
        .await
        .unwrap()
        .unwrap();
    assert!(payment.credits_added);
    assert_eq!(payment.status, "approved");

    // The webhook for the already-credited payment arrives late: accepted,
    // balance untouched.
    let app = common::build_test_app_with(pool.clone(), processor);
    let event = serde_json::json!({ "type": "payment", "data": { "id": processor_id } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(user_credits(&pool, "pix@test.com").await, 25.0);
}

/// A card payment routes through tokenization and BIN resolution; a
/// pending status leaves the balance untouched until the webhook confirms.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_card_payment_pending_then_webhook_approval(pool: PgPool) {
    let json = register_user(pool.clone(), "card@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    let processor = Arc::new(MockProcessor::default());
    processor.set_create_status("pending");

    let app = common::build_test_app_with(pool.clone(), Arc::clone(&processor));
    let response = post_json_auth(app, "/api/v1/payments", card_body(10.0, "4111111111111111"), token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    let processor_id = json["id"].as_str().unwrap().to_string();

    assert_eq!(user_credits(&pool, "card@test.com").await, 0.0);

    // Processor approves out of band; its webhook arrives.
    processor.set_payment_status(&processor_id, "approved");
    let app = common::build_test_app_with(pool.clone(), Arc::clone(&processor));
    let event = serde_json::json!({ "type": "payment", "data": { "id": processor_id } });
    let response = post_json(app, "/api/v1/payments/webhook", event.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(user_credits(&pool, "card@test.com").await, 10.0);

    // Replayed delivery: acknowledged, no second credit.
    let app = common::build_test_app_with(pool.clone(), processor);
    let response = post_json(app, "/api/v1/payments/webhook", event).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(user_credits(&pool, "card@test.com").await, 10.0);
}

/// A card number matching no published BIN rule is rejected before any
/// processor payment is created.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_card_with_unresolved_method(pool: PgPool) {
    let json = register_user(pool.clone(), "nobin@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    let app = common::build_test_app(pool.clone());
    // 6011... matches neither ^4 nor ^5 in the mock catalog.
    let response = post_json_auth(app, "/api/v1/payments", card_body(10.0, "6011000990139424"), token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNRESOLVED_PAYMENT_METHOD");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "no ledger row before the processor call");
}

/// Tokenization failure surfaces as 400 and leaves no ledger row.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_card_tokenization_failure(pool: PgPool) {
    let json = register_user(pool.clone(), "badcard@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    let processor = Arc::new(MockProcessor::default());
    processor.fail_tokenize();

    let app = common::build_test_app_with(pool.clone(), processor);
    let response = post_json_auth(app, "/api/v1/payments", card_body(10.0, "4111111111111111"), token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "TOKENIZATION_FAILED");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

/// Processor rejection after the pending insert marks the row failed; the
/// row is kept for audit.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_processor_rejection_marks_row_failed(pool: PgPool) {
    let json = register_user(pool.clone(), "reject@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();
    let user_id = json["user"]["id"].as_i64().unwrap();

    let processor = Arc::new(MockProcessor::default());
    processor.fail_create();

    let app = common::build_test_app_with(pool.clone(), processor);
    let body = serde_json::json!({ "amount": 10.0, "method": "pix" });
    let response = post_json_auth(app, "/api/v1/payments", body, token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PAYMENT_REJECTED");

    let rows = PaymentRepo::list_for_user(&pool, user_id, None, 10, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "failed");
    assert!(!rows[0].credits_added);
    assert_eq!(user_credits(&pool, "reject@test.com").await, 0.0);
}

/// Validation failures on the request body.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_payment_validation(pool: PgPool) {
    let json = register_user(pool.clone(), "valid@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    for body in [
        serde_json::json!({ "amount": 0.0, "method": "pix" }),
        serde_json::json!({ "amount": -5.0, "method": "pix" }),
        serde_json::json!({ "amount": 10.0, "method": "card" }), // no card details
        serde_json::json!({ "amount": 10.0, "method": "cash" }),
    ] {
        let app = common::build_test_app(pool.clone());
        let response = post_json_auth(app, "/api/v1/payments", body, token).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_payment_requires_auth(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = serde_json::json!({ "amount": 10.0, "method": "pix" });
    let response = post_json(app, "/api/v1/payments", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Webhook reconciliation
// ---------------------------------------------------------------------------

/// Unknown event types are acknowledged and ignored.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_webhook_unknown_type_is_ignored(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let event = serde_json::json!({ "type": "plan", "data": { "id": "123" } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ignored");
}

/// The processor id may arrive as a JSON number.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_webhook_accepts_numeric_id(pool: PgPool) {
    let json = register_user(pool.clone(), "numid@test.com", "password123").await;
    let user_id = json["user"]["id"].as_i64().unwrap();

    let row = PaymentRepo::create(
        &pool,
        &CreatePayment {
            user_id,
            amount: 5.0,
            description: String::new(),
            method: "pix".to_string(),
        },
    )
    .await
    .unwrap();
    PaymentRepo::record_processor_result(&pool, row.id, "777", "pending")
        .await
        .unwrap();

    let processor = Arc::new(MockProcessor::default());
    processor.set_payment_status("777", "approved");

    let app = common::build_test_app_with(pool.clone(), processor);
    let event = serde_json::json!({ "type": "payment", "data": { "id": 777 } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(user_credits(&pool, "numid@test.com").await, 5.0);
}

/// A processor fetch failure propagates as 502 so delivery is retried.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_webhook_fetch_failure_returns_502(pool: PgPool) {
    let processor = Arc::new(MockProcessor::default());
    processor.fail_get();

    let app = common::build_test_app_with(pool, processor);
    let event = serde_json::json!({ "type": "payment", "data": { "id": "mp-1" } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

/// An id the processor does not know is a terminal failure: 400, so the
/// processor stops redelivering an event that can never succeed.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_webhook_unknown_payment_id_returns_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let event = serde_json::json!({ "type": "payment", "data": { "id": "mp-ghost" } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Non-approved statuses reported by the processor are mirrored onto the
/// local row without touching the balance.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_webhook_mirrors_non_approved_status(pool: PgPool) {
    let json = register_user(pool.clone(), "mirror@test.com", "password123").await;
    let user_id = json["user"]["id"].as_i64().unwrap();

    let row = PaymentRepo::create(
        &pool,
        &CreatePayment {
            user_id,
            amount: 5.0,
            description: String::new(),
            method: "pix".to_string(),
        },
    )
    .await
    .unwrap();
    PaymentRepo::record_processor_result(&pool, row.id, "mp-mirror", "pending")
        .await
        .unwrap();

    let processor = Arc::new(MockProcessor::default());
    processor.set_payment_status("mp-mirror", "cancelled");

    let app = common::build_test_app_with(pool.clone(), processor);
    let event = serde_json::json!({ "type": "payment", "data": { "id": "mp-mirror" } });
    let response = post_json(app, "/api/v1/payments/webhook", event).await;
    assert_eq!(response.status(), StatusCode::OK);

    let payment = PaymentRepo::find_by_processor_id(&pool, "mp-mirror")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, "cancelled");
    assert!(!payment.credits_added);
    assert_eq!(user_credits(&pool, "mirror@test.com").await, 0.0);
}

// ---------------------------------------------------------------------------
// At-most-once credit rule
// ---------------------------------------------------------------------------

/// Two concurrent applications of the credit rule for one payment move the
/// balance exactly once.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_concurrent_credit_applies_once(pool: PgPool) {
    let json = register_user(pool.clone(), "race@test.com", "password123").await;
    let user_id = json["user"]["id"].as_i64().unwrap();

    let row = PaymentRepo::create(
        &pool,
        &CreatePayment {
            user_id,
            amount: 42.0,
            description: String::new(),
            method: "pix".to_string(),
        },
    )
    .await
    .unwrap();
    PaymentRepo::record_processor_result(&pool, row.id, "mp-race", "pending")
        .await
        .unwrap();

    // The synchronous confirmation path and the webhook racing each other.
    let (a, b) = tokio::join!(
        PaymentRepo::apply_credit(&pool, "mp-race", 1.0),
        PaymentRepo::apply_credit(&pool, "mp-race", 1.0),
    );
    let applied = [a.unwrap(), b.unwrap()];
    assert_eq!(
        applied.iter().filter(|r| r.is_some()).count(),
        1,
        "exactly one of the racing calls must claim the credit"
    );

    assert_eq!(user_credits(&pool, "race@test.com").await, 42.0);
}

/// Applying the rule for an unknown payment id is a no-op.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_credit_unknown_payment_is_noop(pool: PgPool) {
    let result = PaymentRepo::apply_credit(&pool, "mp-ghost", 1.0).await.unwrap();
    assert!(result.is_none());
}

/// The credit respects a non-unit conversion rate.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_credit_unit_value_conversion(pool: PgPool) {
    let json = register_user(pool.clone(), "rate@test.com", "password123").await;
    let user_id = json["user"]["id"].as_i64().unwrap();

    let row = PaymentRepo::create(
        &pool,
        &CreatePayment {
            user_id,
            amount: 10.0,
            description: String::new(),
            method: "pix".to_string(),
        },
    )
    .await
    .unwrap();
    PaymentRepo::record_processor_result(&pool, row.id, "mp-rate", "pending")
        .await
        .unwrap();

    // 10.0 currency units at 2.5 per credit -> 4 credits.
    let balance = PaymentRepo::apply_credit(&pool, "mp-rate", 2.5).await.unwrap();
    assert_eq!(balance, Some(4.0));
}

// ---------------------------------------------------------------------------
// Listing and balance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_payments_pagination(pool: PgPool) {
    let json = register_user(pool.clone(), "list@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();
    let user_id = json["user"]["id"].as_i64().unwrap();

    for i in 0..5 {
        let row = PaymentRepo::create(
            &pool,
            &CreatePayment {
                user_id,
                amount: (i + 1) as f64,
                description: format!("payment {i}"),
                method: "pix".to_string(),
            },
        )
        .await
        .unwrap();
        PaymentRepo::record_processor_result(&pool, row.id, &format!("mp-list-{i}"), "pending")
            .await
            .unwrap();
    }

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/payments?page=1&size=2", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 5);
    assert_eq!(json["page"], 1);
    assert_eq!(json["size"], 2);
    assert_eq!(json["pages"], 3); // ceil(5 / 2)
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    // Insertion order is stable.
    assert_eq!(items[0]["description"], "payment 0");
    assert_eq!(items[1]["description"], "payment 1");

    // Last page holds the remainder.
    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/payments?page=3&size=2", token).await;
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 1);

    // Filter by processor id.
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/payments?processor_id=mp-list-3", token).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["items"][0]["processor_id"], "mp-list-3");
}

/// Listing never leaks another user's rows.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_payments_scoped_to_user(pool: PgPool) {
    let owner = register_user(pool.clone(), "owner@test.com", "password123").await;
    let other = register_user(pool.clone(), "other@test.com", "password123").await;
    let owner_id = owner["user"]["id"].as_i64().unwrap();
    let other_token = other["access_token"].as_str().unwrap();

    PaymentRepo::create(
        &pool,
        &CreatePayment {
            user_id: owner_id,
            amount: 3.0,
            description: "owner payment".to_string(),
            method: "pix".to_string(),
        },
    )
    .await
    .unwrap();

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/payments", other_token).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_credits_endpoint(pool: PgPool) {
    let json = register_user(pool.clone(), "bal@test.com", "password123").await;
    let token = json["access_token"].as_str().unwrap();

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/payments/credits", token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["credits"], 0.0);
}
