use crate::{
    db::Database,
    dto::pages::{CreatePageRequest, PageResponse, UpdatePageRequest},
    error::AppError,
    repositories::pages as page_repo,
    services::blob_store::BlobStore,
    usecases::ownership::OwnershipCoordinator,
};

pub struct PageService;

impl PageService {
    pub async fn create_page(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        req: CreatePageRequest,
    ) -> Result<PageResponse, AppError> {
        let page = coordinator.create_page(user_id, req.into()).await?;
        Ok(PageResponse::new(page, coordinator.links()))
    }

    pub async fn list_pages(
        db: &Database,
        coordinator: &OwnershipCoordinator,
        user_id: i64,
    ) -> Result<Vec<PageResponse>, AppError> {
        let pages = page_repo::list_for_user(db.pool(), user_id).await?;
        Ok(pages
            .into_iter()
            .map(|page| PageResponse::new(page, coordinator.links()))
            .collect())
    }

    pub async fn get_page(
        db: &Database,
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        page_id: i64,
    ) -> Result<PageResponse, AppError> {
        let page = page_repo::find_owned(db.pool(), page_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Page not found".to_string()))?;
        Ok(PageResponse::new(page, coordinator.links()))
    }

    pub async fn update_page(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        page_id: i64,
        req: UpdatePageRequest,
    ) -> Result<PageResponse, AppError> {
        let page = coordinator.update_page(user_id, page_id, req.into()).await?;
        Ok(PageResponse::new(page, coordinator.links()))
    }

    /// Deletes the page, then the uploaded files no other page lists.
    pub async fn delete_page(
        coordinator: &OwnershipCoordinator,
        blobs: &BlobStore,
        user_id: i64,
        page_id: i64,
    ) -> Result<(), AppError> {
        let files = coordinator.delete_page(user_id, page_id).await?;
        blobs.delete_all(&files).await;
        Ok(())
    }
}
