//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use tutor_credits_core::CreditAccount;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current credit balance.
    pub balance: i64,
    /// Lifetime credits granted.
    pub lifetime_granted: i64,
    /// Lifetime credits used.
    pub lifetime_used: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&CreditAccount> for AccountResponse {
    fn from(account: &CreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            lifetime_granted: account.lifetime_granted,
            lifetime_used: account.lifetime_used,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create or register a new account.
///
/// The account is opened with the configured starter grant already applied.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account = state.ledger.create_account(auth.user_id).await?;

    tracing::info!(user_id = %auth.user_id, balance = %account.balance, "Account created");

    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .ledger
        .lookup_account(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}
