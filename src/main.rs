use std::sync::Arc;

use appointment_calendar::{build_router, config::AppConfig, store::Store, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // RUST_LOG wins over the configured default
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = AppState {
        store: Arc::new(Store::new(config.db_path.clone())),
    };
    let app = build_router(state, config.static_dir.clone());

    let listener = tokio::net::TcpListener::bind(config.bind).await?;

    tracing::info!(
        addr = %config.bind,
        db = %config.db_path.display(),
        static_dir = %config.static_dir.display(),
        "server running, API base at /api"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
