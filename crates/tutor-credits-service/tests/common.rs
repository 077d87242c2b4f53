//! Common test utilities for tutor-credits integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use tutor_credits_core::UserId;
use tutor_credits_service::{create_router, AppState, ServiceConfig};
use tutor_credits_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and the default
    /// starter grant.
    pub fn new() -> Self {
        Self::with_starter_grant(20)
    }

    /// Create a harness with a specific starter grant (0 for tests that
    /// need empty accounts).
    pub fn with_starter_grant(starter_grant_credits: i64) -> Self {
        Self::build(starter_grant_credits, None)
    }

    /// Create a harness with JWT verification enabled.
    pub fn with_auth_secret(secret: &str) -> Self {
        Self::build(20, Some(secret.to_string()))
    }

    fn build(starter_grant_credits: i64, auth_secret: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            database_url: None,
            auth_secret,
            auth_audience: "tutor-credits".into(),
            service_api_key: Some(service_api_key.clone()),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            starter_grant_credits,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id,
            service_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        let other_user = UserId::generate();
        format!("Bearer test-token:{other_user}")
    }

    /// Create the test user's account via the API.
    pub async fn create_account(&self) {
        self.server
            .post("/v1/accounts")
            .add_header("authorization", self.user_auth_header())
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
