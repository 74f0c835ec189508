use crate::{
    db::Database,
    dto::{
        pages::PageResponse,
        qrs::{CreateQrRequest, CreateQrResponse, QrResponse, UpdateQrRequest},
    },
    error::AppError,
    repositories::qrs::{self as qr_repo, QRS},
    usecases::ownership::OwnershipCoordinator,
};

pub struct QrService;

impl QrService {
    pub async fn create_qr(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        req: CreateQrRequest,
    ) -> Result<CreateQrResponse, AppError> {
        let created = coordinator.create_qr(user_id, req.into()).await?;
        Ok(CreateQrResponse {
            qr: QrResponse::from(created.qr),
            page: created
                .page
                .map(|page| PageResponse::new(page, coordinator.links())),
        })
    }

    pub async fn list_qrs(db: &Database, user_id: i64) -> Result<Vec<QrResponse>, AppError> {
        let qrs = qr_repo::list_for_user(db.pool(), user_id).await?;
        Ok(qrs.into_iter().map(QrResponse::from).collect())
    }

    pub async fn get_qr(db: &Database, user_id: i64, qr_id: i64) -> Result<QrResponse, AppError> {
        let qr = qr_repo::find_owned(db.pool(), qr_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("QR not found".to_string()))?;
        Ok(QrResponse::from(qr))
    }

    pub async fn update_qr(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        qr_id: i64,
        req: UpdateQrRequest,
    ) -> Result<QrResponse, AppError> {
        let qr = coordinator.update_qr(user_id, qr_id, req.into()).await?;
        Ok(QrResponse::from(qr))
    }

    pub async fn relink_qr(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        qr_id: i64,
        page_id: i64,
    ) -> Result<QrResponse, AppError> {
        let qr = coordinator.relink_qr(user_id, qr_id, page_id).await?;
        Ok(QrResponse::from(qr))
    }

    pub async fn delete_qr(
        coordinator: &OwnershipCoordinator,
        user_id: i64,
        qr_id: i64,
    ) -> Result<(), AppError> {
        coordinator.delete_qr(user_id, qr_id).await
    }

    /// Destination of a scanned QR. Unresolved QRs are reported as missing.
    pub async fn resolve_link(db: &Database, qr_id: i64) -> Result<String, AppError> {
        QRS.get(db.pool(), qr_id)
            .await?
            .and_then(|qr| qr.link)
            .ok_or_else(|| AppError::NotFound("QR has no destination".to_string()))
    }
}
