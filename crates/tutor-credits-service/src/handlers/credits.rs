//! Credit balance, history, and grant handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tutor_credits_core::{CreditCheck, CreditTransaction, GrantOutcome, TransactionType, UserId};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current credit balance.
    pub balance: i64,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state
        .ledger
        .lookup_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(BalanceResponse {
        balance: account.balance,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed credit amount (positive = grant, negative = usage).
    pub amount: i64,
    /// Transaction type.
    pub transaction_type: String,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Additional metadata.
    pub metadata: serde_json::Value,
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            transaction_type: tx.transaction_type.as_str().to_string(),
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            metadata: tx.metadata.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Verify account exists
    state
        .ledger
        .lookup_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let (transactions, has_more) = state
        .ledger
        .get_credit_history_page(&auth.user_id, query.limit, query.offset)
        .await?;
    let transactions: Vec<_> = transactions.iter().map(TransactionResponse::from).collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Credit check request (service auth).
#[derive(Debug, Deserialize)]
pub struct CheckCreditsRequest {
    /// User ID to check.
    pub user_id: String,
}

/// Check whether a user has credits available.
///
/// Never fails on the user's behalf: an unknown user or a storage failure
/// comes back as a denial with the reason set.
pub async fn check_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CheckCreditsRequest>,
) -> Result<Json<CreditCheck>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    Ok(Json(state.ledger.check_user_credits(&user_id).await))
}

/// Grant credits request (service auth).
#[derive(Debug, Deserialize)]
pub struct GrantCreditsRequest {
    /// User ID to credit.
    pub user_id: String,
    /// Number of credits to add (must be positive).
    pub amount: i64,
    /// Transaction type (default: purchase). Must be a credit type.
    #[serde(default = "default_grant_type")]
    pub transaction_type: TransactionType,
    /// Human-readable reason for the grant.
    pub description: Option<String>,
    /// Additional metadata, carried verbatim into the transaction record.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_grant_type() -> TransactionType {
    TransactionType::Purchase
}

/// Grant credits to a user (purchase fulfillment, bonus, refund).
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<GrantCreditsRequest>,
) -> Result<Json<GrantOutcome>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        amount = %body.amount,
        "Processing credit grant"
    );

    let outcome = state
        .ledger
        .grant_credits(
            &user_id,
            body.amount,
            body.transaction_type,
            body.description.as_deref(),
            body.metadata,
        )
        .await;

    Ok(Json(outcome))
}
