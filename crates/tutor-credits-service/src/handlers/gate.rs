//! Provider gate handler.
//!
//! The gate is the single decision point the AI request router calls before
//! dispatching: it checks the user's balance, deducts the operation's cost,
//! and answers which provider tier to use. Any denial routes the request to
//! the free tier; the caller never has to interpret failure modes itself.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use tutor_credits_core::{GateDecision, OperationKind, UserId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Gate request from the AI request router.
#[derive(Debug, Deserialize)]
pub struct GateRequest {
    /// User ID being metered.
    pub user_id: String,
    /// The operation about to be dispatched.
    pub operation: OperationKind,
    /// Optional description for the transaction record.
    pub description: Option<String>,
}

/// Decide the provider tier for one operation, deducting on success.
pub async fn decide(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<GateRequest>,
) -> Result<Json<GateDecision>, ApiError> {
    let user_id: UserId = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        operation = %body.operation,
        "Processing gate decision"
    );

    let decision = state
        .ledger
        .check_and_deduct(&user_id, body.operation, body.description.as_deref())
        .await;

    Ok(Json(decision))
}
