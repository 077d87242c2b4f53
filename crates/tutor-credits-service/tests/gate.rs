//! Provider gate integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

fn gate_body(harness: &TestHarness, operation: &str) -> serde_json::Value {
    json!({
        "user_id": harness.test_user_id.to_string(),
        "operation": operation
    })
}

#[tokio::test]
async fn gate_selects_premium_and_deducts() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "solve-math"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["use_premium"], true);
    assert_eq!(body["credit_balance"], 18);
    assert_eq!(body["deduction"]["success"], true);
    assert_eq!(body["deduction"]["new_balance"], 18);
}

#[tokio::test]
async fn gate_on_empty_balance_selects_free_tier() {
    let harness = TestHarness::with_starter_grant(0);
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "chat"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["use_premium"], false);
    assert_eq!(body["credit_balance"], 0);
    assert!(body["deduction"].is_null());

    // Nothing was written to the ledger.
    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert!(body["transactions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn gate_unknown_user_fails_closed() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "chat"))
        .await;

    // Fail closed: free tier, no HTTP error.
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["use_premium"], false);
    assert_eq!(body["credit_balance"], 0);
}

#[tokio::test]
async fn gate_unknown_operation_is_bad_request() {
    let harness = TestHarness::new();
    harness.create_account().await;

    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "summon-dragon"))
        .await;

    // Unknown operations are rejected at deserialization, not defaulted.
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn gate_requires_api_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/gate")
        .json(&gate_body(&harness, "chat"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn gate_costs_follow_operation_table() {
    let harness = TestHarness::new();
    harness.create_account().await;

    // chat costs 1, teacher-feedback costs 3.
    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "chat"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["credit_balance"], 19);

    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "teacher-feedback"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["credit_balance"], 16);
}

#[tokio::test]
async fn gate_drains_balance_then_degrades() {
    let harness = TestHarness::with_starter_grant(2);
    harness.create_account().await;

    // Two chat operations drain the balance.
    for expected in [1, 0] {
        let response = harness
            .server
            .post("/v1/gate")
            .add_header("x-api-key", harness.service_api_key.clone())
            .json(&gate_body(&harness, "chat"))
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["use_premium"], true);
        assert_eq!(body["credit_balance"], expected);
    }

    // The third falls back to the free tier.
    let response = harness
        .server
        .post("/v1/gate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&gate_body(&harness, "chat"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["use_premium"], false);
    assert_eq!(body["credit_balance"], 0);
}
