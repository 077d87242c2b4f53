//! Tutor-credits HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use tutor_credits_core::{CreditCheck, GateDecision, GrantOutcome, OperationKind};

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, CheckCreditsRequest, GateRequest, GrantCreditsRequest,
};

/// Tutor-credits API client.
///
/// Used by the AI request router to gate operations, and by backend services
/// to grant credits after purchases.
#[derive(Debug, Clone)]
pub struct CreditsClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl CreditsClient {
    /// Create a new tutor-credits client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://tutor-credits:8080"`)
    /// * `api_key` - Service API key for authentication
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new tutor-credits client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        }
    }

    /// Gate one AI operation: check the user's credits, deduct the cost,
    /// and learn which provider tier to use.
    ///
    /// A denial (no account, empty balance, storage trouble) is a successful
    /// response with `use_premium == false`, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn gate(
        &self,
        user_id: impl Into<String>,
        operation: OperationKind,
        description: Option<String>,
    ) -> Result<GateDecision, ClientError> {
        let url = format!("{}/v1/gate", self.base_url);
        let request = GateRequest {
            user_id: user_id.into(),
            operation,
            description,
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Check whether a user has credits available, without deducting.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn check_credits(
        &self,
        user_id: impl Into<String>,
    ) -> Result<CreditCheck, ClientError> {
        let url = format!("{}/v1/credits/check", self.base_url);
        let request = CheckCreditsRequest {
            user_id: user_id.into(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Grant credits to a user (purchase fulfillment, bonus, refund).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn grant_credits(
        &self,
        request: GrantCreditsRequest,
    ) -> Result<GrantOutcome, ClientError> {
        let url = format!("{}/v1/credits/grant", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a user's current balance (requires user JWT, not service API key).
    ///
    /// This method is typically used by the user-facing dashboard, not by services.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/credits/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {user_jwt}"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;

                match code {
                    "insufficient_credits" => {
                        let balance = api_error
                            .error
                            .details
                            .as_ref()
                            .and_then(|d| d.get("balance"))
                            .and_then(serde_json::Value::as_i64)
                            .unwrap_or(0);
                        let required = api_error
                            .error
                            .details
                            .as_ref()
                            .and_then(|d| d.get("required"))
                            .and_then(serde_json::Value::as_i64)
                            .unwrap_or(0);

                        Err(ClientError::InsufficientCredits { balance, required })
                    }
                    "not_found" if message.contains("Account") => {
                        Err(ClientError::AccountNotFound {
                            user_id: message.replace("Account not found: ", ""),
                        })
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = CreditsClient::new("http://localhost:8080", "test-api-key");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = CreditsClient::new("http://localhost:8080/", "test-api-key");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("ai-router");
        let client = CreditsClient::with_options("http://localhost:8080", "key", options);
        assert_eq!(client.service_name, "ai-router");
    }
}
