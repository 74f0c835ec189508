//! Fixtures shared by unit and router tests.

use std::net::SocketAddr;

use axum::Router;
use tempfile::TempDir;

use crate::{
    app::{
        self,
        config::{AppConfig, AuthConfig, DatabaseConfig},
        state::AppState,
    },
    db::Database,
    repositories::users::{NewUser, USERS},
    services::blob_store::BlobStore,
    usecases::ownership::{LinkBuilder, OwnershipCoordinator},
};

pub const BASE_URL: &str = "https://qr.test";
pub const MAX_UPLOAD_BYTES: usize = 1024;

pub async fn memory_db() -> Database {
    Database::in_memory().await.unwrap()
}

pub async fn seed_user(db: &Database, username: &str) -> i64 {
    USERS
        .insert(
            db.pool(),
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "not-a-real-hash".to_string(),
            },
        )
        .await
        .unwrap()
        .id
}

pub fn coordinator(db: &Database) -> OwnershipCoordinator {
    OwnershipCoordinator::new(db.clone(), LinkBuilder::new(BASE_URL))
}

pub fn config(upload_dir: &TempDir) -> AppConfig {
    AppConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origin: "http://localhost:5173".to_string(),
        public_base_url: BASE_URL.to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            expiration_days: 30,
            issuer: None,
            audience: None,
            cookie_secure: true,
        },
    }
}

/// A router over a fresh in-memory store and a temporary upload directory.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _uploads: TempDir,
}

pub async fn test_app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = config(&uploads);
    let db = memory_db().await;
    let blobs = BlobStore::open(config.upload_dir.clone(), config.max_upload_bytes)
        .await
        .unwrap();
    let state = AppState::new(db, blobs, &config);
    let router = app::router::build_router(state.clone(), &config).unwrap();
    TestApp {
        state,
        router,
        _uploads: uploads,
    }
}
