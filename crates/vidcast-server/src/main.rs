//! # vidcast-server
//!
//! HTTP backend for vidcast, a small video-sharing site.
//!
//! This binary provides:
//! - **REST API** (axum) under `/api/v1` for accounts, channels, videos,
//!   comments and tags
//! - **Access-token auth** via a bearer header or the `accessToken` cookie
//! - **Media storage** for uploaded thumbnails, avatars, banners and video
//!   files, served back from `/media`
//! - **SQLite persistence** with transactional referential-integrity
//!   cascades (see `vidcast-store`)

mod api;
mod auth;
mod config;
mod error;
mod form;
mod media_store;
mod routes;
mod store;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vidcast_shared::token::TokenSigner;
use vidcast_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::media_store::MediaStore;
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,vidcast_server=debug,vidcast_store=debug")
            }),
        )
        .init();

    info!("Starting vidcast server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (runs migrations on open)
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }
    let store = Store::new(db);

    // Media store (creates directory if missing)
    let media = Arc::new(
        MediaStore::new(
            config.media_storage_path.clone(),
            config.max_upload_size,
            &config.public_base_url,
        )
        .await?,
    );

    // Token signer
    let signer = match &config.access_token_secret {
        Some(secret) => TokenSigner::from_secret(secret.as_bytes()),
        None => {
            warn!("ACCESS_TOKEN_SECRET not set; using a random key, sessions end on restart");
            TokenSigner::generate()
        }
    };

    let http_addr = config.http_addr;
    let app_state = AppState {
        store: store.clone(),
        media,
        signer: Arc::new(signer),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
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

    // -----------------------------------------------------------------------
    // 5. Close the store once the router (and its state) is gone
    // -----------------------------------------------------------------------
    if let Err(e) = store.close() {
        warn!(error = %e, "Database not closed cleanly");
    }

    Ok(())
}
