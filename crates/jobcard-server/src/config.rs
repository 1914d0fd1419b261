//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: unset, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Directory holding complaint photos.
    /// Env: `IMAGE_STORAGE_PATH`
    /// Default: `./media/complaint_images`
    pub image_storage_path: PathBuf,

    /// Maximum size of one uploaded image in bytes.
    /// Env: `MAX_IMAGE_SIZE`
    /// Default: 10 MiB
    pub max_image_size: usize,

    /// Maximum size of a whole request body in bytes.
    /// Env: `MAX_BODY_SIZE`
    /// Default: 64 MiB
    pub max_body_size: usize,

    /// Whether an edit deletes complaints that the form no longer lists.
    /// Env: `SWEEP_ORPHANS` (true/false)
    /// Default: `true`
    pub sweep_orphans: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: None,
            image_storage_path: PathBuf::from("./media/complaint_images"),
            max_image_size: 10 * 1024 * 1024, // 10 MiB
            max_body_size: 64 * 1024 * 1024,  // 64 MiB
            sweep_orphans: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(path) = var("IMAGE_STORAGE_PATH") {
            config.image_storage_path = PathBuf::from(path);
        }

        if let Some(val) = var("MAX_IMAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_image_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_IMAGE_SIZE, using default"),
            }
        }

        if let Some(val) = var("MAX_BODY_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_body_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BODY_SIZE, using default"),
            }
        }

        if let Some(val) = var("SWEEP_ORPHANS") {
            config.sweep_orphans = val != "false" && val != "0";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
