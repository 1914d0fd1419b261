//! # jobcard-server
//!
//! HTTP front end for the repair shop's job cards.
//!
//! This binary provides:
//! - **List / detail** endpoints returning job cards newest-first with their
//!   complaints and photos nested
//! - **Create / edit** endpoints taking a multipart form (flat legacy fields or
//!   a nested JSON `payload`) and reconciling it in one transaction
//! - **Delete** with cascading removal of complaints, images and files
//! - **Image download** for stored complaint photos

mod api;
mod config;
mod error;

use std::sync::{Arc, Mutex};

use jobcard_store::{Database, ImageStore};
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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,jobcard_server=debug,jobcard_store=debug")
            }),
        )
        .init();

    info!("Starting job card server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open storage
    // -----------------------------------------------------------------------
    let images = ImageStore::new(config.image_storage_path.clone(), config.max_image_size)?;
    let database = match &config.database_path {
        Some(path) => Database::open_at(path, images)?,
        None => Database::new(images)?,
    };

    let app_state = AppState {
        db: Arc::new(Mutex::new(database)),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
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
