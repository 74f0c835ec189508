use crate::{
    error::AppError,
    repositories::{
        Changeset, Filter,
        pages::{self as page_repo, PAGES},
        qrs::{self as qr_repo, QRS},
        users::USERS,
    },
    telemetry::BusinessEvent,
};

use super::{OwnershipCoordinator, UserDeletion, unlisted_files};

impl OwnershipCoordinator {
    /// Deletes the user with their QRs and pages. Blob references of the
    /// deleted pages are returned for cleanup after commit.
    pub async fn delete_user(&self, user_id: i64) -> Result<UserDeletion, AppError> {
        let mut tx = self.begin().await?;
        USERS
            .get(&mut *tx, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let qrs = qr_repo::list_for_user(&mut *tx, user_id).await?;
        for qr in &qrs {
            PAGES
                .update_where(
                    &mut *tx,
                    Filter::new().eq("qr_id", qr.id),
                    Changeset::new().set("qr_id", None::<i64>),
                )
                .await?;
        }
        let qrs_deleted = QRS
            .delete_where(&mut *tx, Filter::new().eq("user_id", user_id))
            .await?;

        let pages = page_repo::list_for_user(&mut *tx, user_id).await?;
        let files: Vec<String> = pages.into_iter().flat_map(|page| page.files).collect();
        let pages_deleted = PAGES
            .delete_where(&mut *tx, Filter::new().eq("user_id", user_id))
            .await?;
        let files = unlisted_files(&mut tx, files).await?;

        USERS.delete(&mut *tx, user_id).await?;
        tx.commit().await?;

        BusinessEvent::UserDeleted {
            user_id,
            qrs_deleted,
            pages_deleted,
        }
        .log();
        Ok(UserDeletion {
            qrs_deleted,
            pages_deleted,
            files,
        })
    }
}
