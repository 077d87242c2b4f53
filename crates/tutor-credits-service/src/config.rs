//! Service configuration.

use tutor_credits_core::DEFAULT_STARTER_GRANT_CREDITS;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/tutor-credits").
    pub data_dir: String,

    /// PostgreSQL connection URL. When set, the service uses PostgreSQL
    /// instead of the embedded `RocksDB` store.
    pub database_url: Option<String>,

    /// HS256 secret for validating end-user JWTs. When unset, the service
    /// only accepts `test-token:<uuid>` bearer tokens (local development).
    pub auth_secret: Option<String>,

    /// Expected JWT audience (default: "tutor-credits").
    pub auth_audience: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Credits granted to every newly created account.
    pub starter_grant_credits: i64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/tutor-credits".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            auth_secret: std::env::var("AUTH_SECRET").ok(),
            auth_audience: std::env::var("AUTH_AUDIENCE")
                .unwrap_or_else(|_| "tutor-credits".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64 * 1024), // 64KB, the API carries no large payloads
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            starter_grant_credits: std::env::var("STARTER_GRANT_CREDITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STARTER_GRANT_CREDITS),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tutor-credits".into(),
            database_url: None,
            auth_secret: None,
            auth_audience: "tutor-credits".into(),
            service_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            starter_grant_credits: DEFAULT_STARTER_GRANT_CREDITS,
        }
    }
}
