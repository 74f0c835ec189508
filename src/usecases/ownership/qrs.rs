use crate::{
    error::AppError,
    models::qrs::Qr,
    repositories::{
        Changeset, Filter,
        pages::{self as page_repo, NewPage, PAGES},
        qrs::{self as qr_repo, NewQr, QRS},
    },
    telemetry::BusinessEvent,
};

use super::{
    NewQrInput, OwnershipCoordinator, QrCreated, QrPatch,
    naming::{available_page_name, validate_external_link, validate_page_name, validate_qr_name},
    page_not_found, qr_not_found, vanished,
};

impl OwnershipCoordinator {
    /// Creates a QR. Without an external link a blank page is provisioned in
    /// the same transaction and the QR links to it.
    pub async fn create_qr(&self, user_id: i64, input: NewQrInput) -> Result<QrCreated, AppError> {
        let name = validate_qr_name(&input.name)?;
        let link = input
            .link
            .as_deref()
            .map(validate_external_link)
            .transpose()?;
        if let Some(page_name) = &input.page_name {
            validate_page_name(page_name)?;
        }

        let mut tx = self.begin().await?;
        let qr = QRS
            .insert(
                &mut *tx,
                NewQr {
                    user_id,
                    name,
                    description: input.description,
                    link: link.clone(),
                    src: input.src.unwrap_or_default(),
                },
            )
            .await?;

        if link.is_some() {
            tx.commit().await?;
            BusinessEvent::QrCreated {
                qr_id: qr.id,
                user_id,
                provisioned_page_id: None,
            }
            .log();
            return Ok(QrCreated { qr, page: None });
        }

        let page_name = match input.page_name {
            Some(page_name) => {
                if page_repo::name_taken(&mut *tx, &page_name).await? {
                    return Err(AppError::Conflict(format!(
                        "Page name `{}` is already taken",
                        page_name
                    )));
                }
                page_name
            }
            None => available_page_name(&mut tx, &qr.name, qr.id).await?,
        };

        let mut draft = NewPage::blank(user_id, page_name);
        draft.qr_id = Some(qr.id);
        let page = PAGES.insert(&mut *tx, draft).await?;

        qr_repo::set_link(&mut *tx, qr.id, Some(self.links.page_url(&page.name))).await?;
        let qr = QRS
            .get(&mut *tx, qr.id)
            .await?
            .ok_or_else(|| vanished("QR", qr.id))?;
        tx.commit().await?;

        BusinessEvent::QrCreated {
            qr_id: qr.id,
            user_id,
            provisioned_page_id: Some(page.id),
        }
        .log();
        Ok(QrCreated {
            qr,
            page: Some(page),
        })
    }

    pub async fn update_qr(
        &self,
        user_id: i64,
        qr_id: i64,
        patch: QrPatch,
    ) -> Result<Qr, AppError> {
        let mut changes = Changeset::new();
        if let Some(name) = &patch.name {
            changes = changes.set("name", validate_qr_name(name)?);
        }
        if let Some(description) = patch.description {
            changes = changes.set("description", description);
        }
        if let Some(src) = patch.src {
            changes = changes.set("src", src);
        }
        let link = patch
            .link
            .as_deref()
            .map(validate_external_link)
            .transpose()?;

        let mut tx = self.begin().await?;
        let qr = qr_repo::find_owned(&mut *tx, qr_id, user_id)
            .await?
            .ok_or_else(qr_not_found)?;

        if let Some(link) = link {
            if let Some(page) = page_repo::find_by_qr(&mut *tx, qr.id).await? {
                PAGES
                    .update(&mut *tx, page.id, Changeset::new().set("qr_id", None::<i64>))
                    .await?;
            }
            changes = changes.set("link", link);
        }

        let fields = changes.columns();
        QRS.update(&mut *tx, qr.id, changes).await?;
        let qr = QRS
            .get(&mut *tx, qr.id)
            .await?
            .ok_or_else(|| vanished("QR", qr_id))?;
        tx.commit().await?;

        BusinessEvent::QrUpdated {
            qr_id,
            user_id,
            fields,
        }
        .log();
        Ok(qr)
    }

    /// Points a QR at one of the caller's pages. The QR's previous page is
    /// detached and the QR that previously carried the target page loses its
    /// link.
    pub async fn relink_qr(&self, user_id: i64, qr_id: i64, page_id: i64) -> Result<Qr, AppError> {
        let mut tx = self.begin().await?;
        let qr = qr_repo::find_owned(&mut *tx, qr_id, user_id)
            .await?
            .ok_or_else(qr_not_found)?;
        let page = page_repo::find_owned(&mut *tx, page_id, user_id)
            .await?
            .ok_or_else(page_not_found)?;

        if page.qr_id != Some(qr.id) {
            PAGES
                .update_where(
                    &mut *tx,
                    Filter::new().eq("qr_id", qr.id),
                    Changeset::new().set("qr_id", None::<i64>),
                )
                .await?;
            if let Some(previous_qr) = page.qr_id {
                qr_repo::set_link(&mut *tx, previous_qr, None).await?;
            }
            PAGES
                .update(&mut *tx, page.id, Changeset::new().set("qr_id", qr.id))
                .await?;
        }
        qr_repo::set_link(&mut *tx, qr.id, Some(self.links.page_url(&page.name))).await?;

        let qr = QRS
            .get(&mut *tx, qr.id)
            .await?
            .ok_or_else(|| vanished("QR", qr_id))?;
        tx.commit().await?;

        BusinessEvent::QrRelinked {
            qr_id,
            page_id,
            user_id,
        }
        .log();
        Ok(qr)
    }

    /// Deletes a QR. Its page survives with `qr_id` cleared.
    pub async fn delete_qr(&self, user_id: i64, qr_id: i64) -> Result<(), AppError> {
        let mut tx = self.begin().await?;
        let qr = qr_repo::find_owned(&mut *tx, qr_id, user_id)
            .await?
            .ok_or_else(qr_not_found)?;

        let detached = page_repo::find_by_qr(&mut *tx, qr.id).await?;
        if let Some(page) = &detached {
            PAGES
                .update(&mut *tx, page.id, Changeset::new().set("qr_id", None::<i64>))
                .await?;
        }
        QRS.delete(&mut *tx, qr.id).await?;
        tx.commit().await?;

        BusinessEvent::QrDeleted {
            qr_id,
            user_id,
            detached_page_id: detached.map(|page| page.id),
        }
        .log();
        Ok(())
    }
}
