use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use specsheet_api_rest::{router, AppState};
use specsheet_core::{AccessGate, AuthConfig, DocumentStore, HttpFetcher, StoreConfig};

/// Main entry point for the spec-sheet service
///
/// Opens the document store and serves the REST API (with Swagger UI) on
/// `SPECSHEET_REST_ADDR` (default: "0.0.0.0:3000").
///
/// # Environment Variables
/// - `SPECSHEET_REST_ADDR`: REST server address
/// - `SPECSHEET_DATA_DIR`: directory for records and blobs (default: "specsheet_data")
/// - `SPECSHEET_STORAGE`: `records` (default) or `snapshot`
/// - `SPECSHEET_CONTENT`: `blob` (default) or `inline`
/// - `SPECSHEET_ADMIN_EMAIL` / `SPECSHEET_ADMIN_PASSWORD`: the admin account (required)
/// - `SPECSHEET_SESSION_TTL_MINS`, `SPECSHEET_MAX_UPLOAD_BYTES`, `SPECSHEET_MIN_UPLOAD_BYTES`,
///   `SPECSHEET_FETCH_TIMEOUT_SECS`: optional tuning
///
/// # Errors
/// Returns an error if:
/// - the logging configuration cannot be initialised,
/// - any configuration value is missing or invalid,
/// - the data directory cannot be opened or its contents cannot be loaded, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("specsheet=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let lookup = |key: &str| std::env::var(key).ok();
    let store_cfg = StoreConfig::from_lookup(lookup)?;
    let auth_cfg = AuthConfig::from_lookup(lookup)?;
    let rest_addr = lookup("SPECSHEET_REST_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());

    let gate = Arc::new(AccessGate::from_config(&auth_cfg));
    let store = Arc::new(DocumentStore::open(
        &store_cfg,
        gate,
        Arc::new(HttpFetcher::default()),
    )?);

    tracing::info!("++ Starting spec-sheet REST on {}", rest_addr);

    let app = router(AppState::new(store, store_cfg.limits()));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
