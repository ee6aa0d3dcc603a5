//! # bodymap-server
//!
//! HTTP admin API for Body Assignments.
//!
//! This binary provides:
//! - **REST API** (axum) for creating, editing, publishing and previewing
//!   assignments and their nested colors, sub-feelings and final options
//! - **SQLite persistence** through `bodymap-store`
//! - **Bearer-token gate** on every `/api` route when `ADMIN_TOKEN` is set

mod api;
mod config;
mod envelope;
mod error;

use bodymap_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bodymap_server=debug")),
        )
        .init();

    info!("Starting bodymap server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        admin_enabled = config.admin_token.is_some(),
        expose_error_details = config.expose_error_details,
        max_body_bytes = config.max_body_bytes,
        "Loaded configuration"
    );
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, the API is open to anyone");
    }

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let database = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?database.path(), "Database ready");

    let http_addr = config.http_addr;
    let app_state = AppState::new(database, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
