use std::path::PathBuf;

use tokio::net::TcpListener;

use crate::{
    app::{self, config::AppConfig},
    db::Database,
    error::AppError,
    services::blob_store::BlobStore,
    telemetry,
};

pub async fn run() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();
    telemetry::init_tracing();
    log_dotenv(&dotenv);

    let config = AppConfig::from_env()?;
    let db = Database::connect(&config.database).await?;
    let blobs = BlobStore::open(config.upload_dir.clone(), config.max_upload_bytes).await?;

    let state = app::state::AppState::new(db.clone(), blobs, &config);
    let router = app::router::build_router(state, &config)?;

    let addr = config.bind_addr;
    tracing::info!(%addr, "Server listening");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Internal(format!("bind failed: {}", err)))?;
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {}", err)));

    db.close().await;
    tracing::info!("Server stopped");
    result
}

/// A missing `.env` is normal outside development; any other failure is not.
fn log_dotenv(result: &Result<PathBuf, dotenvy::Error>) -> bool {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded .env");
            true
        }
        Err(err) if err.not_found() => {
            tracing::debug!("No .env file, using the process environment");
            true
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read .env");
            false
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
