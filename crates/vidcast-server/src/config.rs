//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use vidcast_shared::constants::{
    DEFAULT_AVATAR_URL, DEFAULT_BANNER_URL, DEFAULT_HTTP_PORT, DEFAULT_TOKEN_TTL_SECS,
    MAX_TOKEN_TTL_SECS, MAX_UPLOAD_SIZE,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:7000`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: unset, meaning the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Directory holding uploaded media.
    /// Env: `MEDIA_STORAGE_PATH`
    /// Default: `./media`
    pub media_storage_path: PathBuf,

    /// Prefix for the URLs handed back for stored media.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://localhost:7000`
    pub public_base_url: String,

    /// Secret the token signing key is derived from.
    /// Env: `ACCESS_TOKEN_SECRET`
    /// Default: unset (a random key per process; tokens die on restart).
    pub access_token_secret: Option<String>,

    /// Env: `ACCESS_TOKEN_TTL_SECS`
    /// Default: 7 days
    pub access_token_ttl_secs: i64,

    /// Origins allowed to make credentialed cross-origin requests.
    /// Env: `CORS_ORIGINS` (comma-separated)
    /// Default: `http://localhost:5173`
    pub cors_origins: Vec<String>,

    /// Maximum size of a single uploaded file.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 100 MiB
    pub max_upload_size: usize,

    /// Env: `DEFAULT_AVATAR_URL`
    pub default_avatar_url: String,

    /// Env: `DEFAULT_BANNER_URL`
    pub default_banner_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            media_storage_path: PathBuf::from("./media"),
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            access_token_secret: None,
            access_token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            cors_origins: vec!["http://localhost:5173".to_string()],
            max_upload_size: MAX_UPLOAD_SIZE,
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            default_banner_url: DEFAULT_BANNER_URL.to_string(),
        }
    }
}

// The secret never goes to the logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("media_storage_path", &self.media_storage_path)
            .field("public_base_url", &self.public_base_url)
            .field("access_token_secret", &self.access_token_secret.as_ref().map(|_| "<set>"))
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("cors_origins", &self.cors_origins)
            .field("max_upload_size", &self.max_upload_size)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = var("MEDIA_STORAGE_PATH").filter(|p| !p.is_empty()) {
            config.media_storage_path = PathBuf::from(path);
        }

        if let Some(url) = var("PUBLIC_BASE_URL").filter(|u| !u.is_empty()) {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(secret) = var("ACCESS_TOKEN_SECRET").filter(|s| !s.is_empty()) {
            config.access_token_secret = Some(secret);
        }

        if let Some(val) = var("ACCESS_TOKEN_TTL_SECS") {
            match val.parse::<i64>() {
                Ok(n) if n > 0 && n <= MAX_TOKEN_TTL_SECS => config.access_token_ttl_secs = n,
                _ => tracing::warn!(value = %val, "Invalid ACCESS_TOKEN_TTL_SECS, using default"),
            }
        }

        if let Some(val) = var("CORS_ORIGINS") {
            let origins: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            if !origins.is_empty() {
                config.cors_origins = origins;
            }
        }

        if let Some(val) = var("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(url) = var("DEFAULT_AVATAR_URL").filter(|u| !u.is_empty()) {
            config.default_avatar_url = url;
        }

        if let Some(url) = var("DEFAULT_BANNER_URL").filter(|u| !u.is_empty()) {
            config.default_banner_url = url;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_secs)
    }
}
