//! Credit balance, history, and grant integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

// ============================================================================
// Balance
// ============================================================================

#[tokio::test]
async fn get_balance_success() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 20);
}

#[tokio::test]
async fn get_balance_without_account_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn get_balance_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/credits/balance").await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Transactions
// ============================================================================

#[tokio::test]
async fn list_transactions_shows_starter_grant() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "starter_grant");
    assert_eq!(transactions[0]["amount"], 20);
    assert_eq!(transactions[0]["balance_after"], 20);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn list_transactions_empty_for_zero_grant() {
    let harness = TestHarness::with_starter_grant(0);
    harness.create_account().await;

    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_transactions_newest_first_with_pagination() {
    let harness = TestHarness::with_starter_grant(0);
    harness.create_account().await;

    // Three grants in order; the list must come back newest first.
    for amount in [1, 2, 3] {
        harness
            .server
            .post("/v1/credits/grant")
            .add_header("x-api-key", harness.service_api_key.clone())
            .json(&json!({
                "user_id": harness.test_user_id.to_string(),
                "amount": amount,
                "transaction_type": "bonus"
            }))
            .await
            .assert_status_ok();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let response = harness
        .server
        .get("/v1/credits/transactions?limit=2&offset=0")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["amount"], 3);
    assert_eq!(transactions[1]["amount"], 2);
    assert_eq!(body["has_more"], true);

    let response = harness
        .server
        .get("/v1/credits/transactions?limit=2&offset=2")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["amount"], 1);
    assert_eq!(body["has_more"], false);
}

// ============================================================================
// Check (service auth)
// ============================================================================

#[tokio::test]
async fn check_credits_available() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/check")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "user_id": harness.test_user_id.to_string() }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["has_credits"], true);
    assert_eq!(body["current_balance"], 20);
    assert_eq!(body["should_use_premium"], true);
}

#[tokio::test]
async fn check_credits_unknown_user_denied_not_error() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/check")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "user_id": harness.test_user_id.to_string() }))
        .await;

    // A missing account is a denial, not an HTTP failure.
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["has_credits"], false);
    assert_eq!(body["should_use_premium"], false);
    assert_eq!(body["current_balance"], 0);
    assert_eq!(body["reason"], "account_not_found");
}

#[tokio::test]
async fn check_credits_requires_api_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/check")
        .json(&json!({ "user_id": harness.test_user_id.to_string() }))
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Grant (service auth)
// ============================================================================

#[tokio::test]
async fn grant_credits_success() {
    let harness = TestHarness::with_starter_grant(0);
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "amount": 50,
            "transaction_type": "purchase",
            "description": "Purchased 50 credits",
            "metadata": { "payment_event": "evt_123" }
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["new_balance"], 50);

    // The grant shows up in history with its metadata.
    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions[0]["metadata"]["payment_event"], "evt_123");
}

#[tokio::test]
async fn grant_negative_amount_rejected() {
    let harness = TestHarness::with_starter_grant(0);
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "amount": -10
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);

    // Balance is untouched.
    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 0);
}

#[tokio::test]
async fn grant_invalid_user_id_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "user_id": "not-a-uuid",
            "amount": 10
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn grant_with_wrong_api_key_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "amount": 10
        }))
        .await;

    response.assert_status_unauthorized();
}
