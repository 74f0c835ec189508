use crate::{
    app::config::AppConfig,
    auth::credentials::CredentialService,
    db::Database,
    services::blob_store::BlobStore,
    usecases::ownership::{LinkBuilder, OwnershipCoordinator},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub coordinator: OwnershipCoordinator,
    pub credentials: CredentialService,
    pub blobs: BlobStore,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(db: Database, blobs: BlobStore, config: &AppConfig) -> Self {
        let links = LinkBuilder::new(&config.public_base_url);
        Self {
            coordinator: OwnershipCoordinator::new(db.clone(), links),
            credentials: CredentialService::from_config(&config.auth),
            cookie_secure: config.auth.cookie_secure,
            db,
            blobs,
        }
    }
}
