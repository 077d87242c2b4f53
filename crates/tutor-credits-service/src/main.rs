//! Tutor Credits Service - credit metering and provider gate HTTP API.
//!
//! This is the main entry point for the tutor-credits service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutor_credits_service::{create_router, AppState, ServiceConfig};
use tutor_credits_store::{PgStore, RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tutor_credits=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tutor Credits Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        postgres_configured = %config.database_url.is_some(),
        starter_grant = %config.starter_grant_credits,
        "Service configuration loaded"
    );

    // Open the storage backend: PostgreSQL when DATABASE_URL is set,
    // embedded RocksDB otherwise.
    let store: Arc<dyn Store> = if let Some(url) = &config.database_url {
        tracing::info!("Connecting to PostgreSQL store");
        Arc::new(PgStore::connect(url).await?)
    } else {
        tracing::info!(path = %config.data_dir, "Opening RocksDB store");
        Arc::new(RocksStore::open(&config.data_dir)?)
    };

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
