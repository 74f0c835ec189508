use std::{net::SocketAddr, path::PathBuf};

use tracing::warn;

use crate::error::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://qr_pages.db?mode=rwc";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:9000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";
const DEFAULT_JWT_SECRET: &str = "qr-pages-development-secret";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub expiration_days: i64,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    /// Base of the canonical page links written into QR records.
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let bind_addr = read_env_string("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| AppError::Internal(format!("BIND_ADDR invalid: {}", err)))?;

        let jwt_secret = match read_env_string("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, falling back to the development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            bind_addr,
            cors_origin: read_env_string("CORS_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            public_base_url: read_env_string("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            upload_dir: read_env_string("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            max_upload_bytes: read_env_parsed::<usize>("MAX_UPLOAD_BYTES")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            database: DatabaseConfig {
                url: read_env_string("DATABASE_URL")
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: read_env_parsed::<u32>("DATABASE_MAX_CONNECTIONS")
                    .filter(|value| *value > 0)
                    .unwrap_or(5),
                acquire_timeout_secs: read_env_parsed::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or(15),
            },
            auth: AuthConfig {
                jwt_secret,
                expiration_days: read_env_parsed::<i64>("JWT_EXPIRATION_DAYS")
                    .filter(|value| *value > 0)
                    .unwrap_or(30),
                issuer: read_env_string("JWT_ISSUER"),
                audience: read_env_string("JWT_AUDIENCE"),
                cookie_secure: read_env_parsed::<bool>("COOKIE_SECURE").unwrap_or(true),
            },
        })
    }
}

fn read_env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    read_env_string(key).and_then(|value| value.parse::<T>().ok())
}
