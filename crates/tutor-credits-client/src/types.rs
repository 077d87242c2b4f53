//! Request and response types for the tutor-credits API.
//!
//! Decision payloads ([`GateDecision`], [`CreditCheck`], [`GrantOutcome`])
//! are re-exported from the core crate; only the client-side request shapes
//! and the dashboard responses live here.

use serde::{Deserialize, Serialize};

pub use tutor_credits_core::{
    CreditCheck, DenialReason, GateDecision, GrantOutcome, OperationKind, TransactionType,
};

/// Gate request sent before dispatching an AI operation.
#[derive(Debug, Clone, Serialize)]
pub struct GateRequest {
    /// User ID being metered.
    pub user_id: String,
    /// The operation about to be dispatched.
    pub operation: OperationKind,
    /// Optional description for the transaction record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Credit check request.
#[derive(Debug, Clone, Serialize)]
pub struct CheckCreditsRequest {
    /// User ID to check.
    pub user_id: String,
}

/// Grant credits request.
#[derive(Debug, Clone, Serialize)]
pub struct GrantCreditsRequest {
    /// User ID to credit.
    pub user_id: String,
    /// Number of credits to add (must be positive).
    pub amount: i64,
    /// Transaction type. Must be a credit type.
    pub transaction_type: TransactionType,
    /// Human-readable reason for the grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Additional metadata, carried verbatim into the transaction record.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Balance response (user-facing).
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Current credit balance.
    pub balance: i64,
}

/// API error response body.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    /// The error payload.
    pub error: ApiErrorBody,
}

/// API error payload.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Structured details (e.g. balance/required for insufficient credits).
    pub details: Option<serde_json::Value>,
}
