//! Application state.

use std::sync::Arc;

use tutor_credits_store::Store;

use crate::config::ServiceConfig;
use crate::ledger::CreditLedger;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger and provider gate.
    pub ledger: CreditLedger,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        if config.auth_secret.is_none() {
            tracing::warn!("AUTH_SECRET not set - only test tokens will be accepted");
        }
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not set - gate endpoints will reject all requests");
        }

        let ledger = CreditLedger::new(store, config.starter_grant_credits);

        Self { ledger, config }
    }
}
