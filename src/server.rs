//! HTTP server assembly.
//!
//! Validates configuration, opens the store, and serves the API until Ctrl-C.

use anyhow::Result;
use axum::Router;
use tracing::info;

use crate::api::{AppState, create_router};
use crate::auth::{AuthState, TokenCodec};
use crate::config::ServerConfig;
use crate::db::{JobBoardStore, create_connection, ensure_schema};

/// Build the application router for `config`.
///
/// Fails before anything is served if the configuration is invalid.
pub async fn create_app(config: &ServerConfig) -> Result<Router> {
    config.validate()?;
    let cors = config.cors.layer()?;

    let db = create_connection(config.database.clone()).await?;
    ensure_schema(&db).await?;

    let codec = TokenCodec::new(&config.secret);
    let auth = AuthState::new(codec, config.cookies.clone());
    let state = AppState::new(JobBoardStore::new(db), auth);

    Ok(create_router(state, cors))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let app = create_app(&config).await?;

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        address = %addr,
        kid = %config.secret.key_id(),
        cookie_secure = config.cookies.secure,
        same_site = %config.cookies.same_site,
        origins = ?config.cors.allowed_origins,
        "Career Code server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
