use std::collections::HashSet;

use sqlx::{Sqlite, Transaction};

use crate::{
    error::AppError,
    models::pages::Page,
    repositories::{
        Changeset,
        pages::{self as page_repo, NewPage, PAGES},
        qrs as qr_repo,
    },
    services::blob_store::StoredBlob,
    telemetry::BusinessEvent,
    validation::elements::validate_elements,
};

use super::{
    OwnershipCoordinator, PageDraft, PagePatch, naming::validate_page_name, page_not_found,
    qr_not_found, unlisted_files, vanished,
};

fn name_taken(name: &str) -> AppError {
    AppError::Conflict(format!("Page name `{}` is already taken", name))
}

fn qr_has_page() -> AppError {
    AppError::Conflict("QR already has a page".to_string())
}

/// File lists only carry blobs the caller uploaded: every reference must
/// already be listed on one of their pages.
async fn check_file_references(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    files: &[String],
) -> Result<(), AppError> {
    if files.is_empty() {
        return Ok(());
    }
    let owned: HashSet<String> = page_repo::list_for_user(&mut **tx, user_id)
        .await?
        .into_iter()
        .flat_map(|page| page.files)
        .collect();
    match files.iter().find(|file| !owned.contains(*file)) {
        Some(unknown) => Err(AppError::invalid_field(
            "files",
            format!("`{}` is not a file uploaded to your pages", unknown),
        )),
        None => Ok(()),
    }
}

impl OwnershipCoordinator {
    /// Creates a page, optionally attached to one of the caller's QRs whose
    /// link is then rewritten to the page.
    pub async fn create_page(&self, user_id: i64, draft: PageDraft) -> Result<Page, AppError> {
        validate_page_name(&draft.name)?;
        let elements = validate_elements(&draft.elements)?;

        let mut tx = self.begin().await?;
        if page_repo::name_taken(&mut *tx, &draft.name).await? {
            return Err(name_taken(&draft.name));
        }
        check_file_references(&mut tx, user_id, &draft.files).await?;
        if let Some(qr_id) = draft.qr_id {
            qr_repo::find_owned(&mut *tx, qr_id, user_id)
                .await?
                .ok_or_else(qr_not_found)?;
            if page_repo::find_by_qr(&mut *tx, qr_id).await?.is_some() {
                return Err(qr_has_page());
            }
        }

        let page = PAGES
            .insert(
                &mut *tx,
                NewPage {
                    user_id,
                    qr_id: draft.qr_id,
                    name: draft.name,
                    title: draft.title,
                    description: draft.description,
                    background: draft.background.unwrap_or_default(),
                    elements,
                    files: draft.files,
                    published: draft.published.unwrap_or(false),
                    theme_settings: draft.theme_settings.unwrap_or_default(),
                },
            )
            .await?;
        if let Some(qr_id) = page.qr_id {
            qr_repo::set_link(&mut *tx, qr_id, Some(self.links.page_url(&page.name))).await?;
        }
        tx.commit().await?;

        BusinessEvent::PageCreated {
            page_id: page.id,
            user_id,
            qr_id: page.qr_id,
            element_count: page.elements.len(),
        }
        .log();
        Ok(page)
    }

    /// Applies a partial update. Renaming or re-attaching keeps the linked QR's
    /// URL in step, and a QR that loses the page loses its link.
    pub async fn update_page(
        &self,
        user_id: i64,
        page_id: i64,
        patch: PagePatch,
    ) -> Result<Page, AppError> {
        if let Some(name) = &patch.name {
            validate_page_name(name)?;
        }
        let elements = patch
            .elements
            .as_deref()
            .map(validate_elements)
            .transpose()?;

        let mut tx = self.begin().await?;
        let page = page_repo::find_owned(&mut *tx, page_id, user_id)
            .await?
            .ok_or_else(page_not_found)?;

        let mut changes = Changeset::new();
        let mut final_name = page.name.clone();
        if let Some(name) = patch.name
            && name != page.name
        {
            if page_repo::name_taken(&mut *tx, &name).await? {
                return Err(name_taken(&name));
            }
            final_name = name.clone();
            changes = changes.set("name", name);
        }
        if let Some(title) = patch.title {
            changes = changes.set("title", title);
        }
        if let Some(description) = patch.description {
            changes = changes.set("description", description);
        }
        if let Some(background) = &patch.background {
            changes = changes.set_json("background", background)?;
        }
        if let Some(elements) = &elements {
            changes = changes.set_json("elements", elements)?;
        }
        if let Some(files) = &patch.files {
            check_file_references(&mut tx, user_id, files).await?;
            changes = changes.set_json("files", files)?;
        }
        if let Some(published) = patch.published {
            changes = changes.set("published", published);
        }
        if let Some(theme_settings) = &patch.theme_settings {
            changes = changes.set_json("theme_settings", theme_settings)?;
        }

        let target_qr = patch.qr_id.unwrap_or(page.qr_id);
        let qr_changed = target_qr != page.qr_id;
        if qr_changed {
            if let Some(qr_id) = target_qr {
                qr_repo::find_owned(&mut *tx, qr_id, user_id)
                    .await?
                    .ok_or_else(qr_not_found)?;
                if page_repo::find_by_qr(&mut *tx, qr_id).await?.is_some() {
                    return Err(qr_has_page());
                }
            }
            changes = changes.set("qr_id", target_qr);
        }

        let fields = changes.columns();
        PAGES.update(&mut *tx, page.id, changes).await?;

        if qr_changed && let Some(previous_qr) = page.qr_id {
            qr_repo::set_link(&mut *tx, previous_qr, None).await?;
        }
        if let Some(qr_id) = target_qr
            && (qr_changed || final_name != page.name)
        {
            qr_repo::set_link(&mut *tx, qr_id, Some(self.links.page_url(&final_name))).await?;
        }

        let page = PAGES
            .get(&mut *tx, page.id)
            .await?
            .ok_or_else(|| vanished("Page", page_id))?;
        tx.commit().await?;

        BusinessEvent::PageUpdated {
            page_id,
            user_id,
            fields,
        }
        .log();
        Ok(page)
    }

    /// Deletes a page and returns the blob references it listed that no other
    /// page still lists. The QR that carried it is kept with a null link.
    pub async fn delete_page(&self, user_id: i64, page_id: i64) -> Result<Vec<String>, AppError> {
        let mut tx = self.begin().await?;
        let page = page_repo::find_owned(&mut *tx, page_id, user_id)
            .await?
            .ok_or_else(page_not_found)?;

        PAGES.delete(&mut *tx, page.id).await?;
        if let Some(qr_id) = page.qr_id {
            qr_repo::set_link(&mut *tx, qr_id, None).await?;
        }
        let files = unlisted_files(&mut tx, page.files).await?;
        tx.commit().await?;

        BusinessEvent::PageDeleted { page_id, user_id }.log();
        Ok(files)
    }

    pub async fn attach_files(
        &self,
        user_id: i64,
        page_id: i64,
        blobs: &[StoredBlob],
    ) -> Result<Page, AppError> {
        let mut tx = self.begin().await?;
        let page = page_repo::find_owned(&mut *tx, page_id, user_id)
            .await?
            .ok_or_else(page_not_found)?;

        let mut files = page.files;
        files.extend(blobs.iter().map(|blob| blob.reference.clone()));
        PAGES
            .update(&mut *tx, page.id, Changeset::new().set_json("files", &files)?)
            .await?;
        let page = PAGES
            .get(&mut *tx, page.id)
            .await?
            .ok_or_else(|| vanished("Page", page_id))?;
        tx.commit().await?;

        BusinessEvent::FilesAttached {
            page_id,
            user_id,
            count: blobs.len(),
            bytes: blobs.iter().map(|blob| blob.size).sum(),
        }
        .log();
        Ok(page)
    }

    /// Removes one blob reference from a page. The flag tells whether no page
    /// lists the blob any more; deleting it is up to the caller once this
    /// commits.
    pub async fn detach_file(
        &self,
        user_id: i64,
        page_id: i64,
        reference: &str,
    ) -> Result<(Page, bool), AppError> {
        let mut tx = self.begin().await?;
        let page = page_repo::find_owned(&mut *tx, page_id, user_id)
            .await?
            .ok_or_else(page_not_found)?;

        if !page.files.iter().any(|file| file == reference) {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        let files: Vec<String> = page
            .files
            .iter()
            .filter(|file| file.as_str() != reference)
            .cloned()
            .collect();
        PAGES
            .update(&mut *tx, page.id, Changeset::new().set_json("files", &files)?)
            .await?;
        let page = PAGES
            .get(&mut *tx, page.id)
            .await?
            .ok_or_else(|| vanished("Page", page_id))?;
        let orphaned = !page_repo::file_listed(&mut *tx, reference).await?;
        tx.commit().await?;

        BusinessEvent::FileDetached { page_id, user_id }.log();
        Ok((page, orphaned))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        app::config::DatabaseConfig,
        db::Database,
        repositories::qrs::QRS,
        testing::{BASE_URL, coordinator, memory_db, seed_user},
        usecases::ownership::NewQrInput,
    };

    fn draft(name: &str) -> PageDraft {
        PageDraft {
            name: name.to_string(),
            ..PageDraft::default()
        }
    }

    fn qr_named(name: &str) -> NewQrInput {
        NewQrInput {
            name: name.to_string(),
            ..NewQrInput::default()
        }
    }

    fn blob(reference: &str, size: u64) -> StoredBlob {
        StoredBlob {
            reference: reference.to_string(),
            size,
            sha256: String::new(),
        }
    }

    #[tokio::test]
    async fn renaming_a_page_rewrites_its_qr_link() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let coordinator = coordinator(&db);

        let created = coordinator
            .create_qr(
                alice,
                NewQrInput {
                    page_name: Some("promo".to_string()),
                    ..qr_named("Promo")
                },
            )
            .await
            .unwrap();
        let page = created.page.unwrap();
        assert_eq!(
            created.qr.link.as_deref(),
            Some(format!("{}/pages/promo", BASE_URL).as_str())
        );

        coordinator
            .update_page(
                alice,
                page.id,
                PagePatch {
                    name: Some("promo2".to_string()),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap();
        let qr = QRS.get(db.pool(), created.qr.id).await.unwrap().unwrap();
        assert_eq!(
            qr.link.as_deref(),
            Some(format!("{}/pages/promo2", BASE_URL).as_str())
        );

        let err = coordinator.create_page(bob, draft("promo2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);
        assert!(page_repo::list_for_user(db.pool(), bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_qr_with_a_page_rejects_a_second_one() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let created = coordinator.create_qr(alice, qr_named("Menu")).await.unwrap();

        let err = coordinator
            .create_page(
                alice,
                PageDraft {
                    qr_id: Some(created.qr.id),
                    ..draft("second")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);

        let standalone = coordinator.create_page(alice, draft("standalone")).await.unwrap();
        let err = coordinator
            .update_page(
                alice,
                standalone.id,
                PagePatch {
                    qr_id: Some(Some(created.qr.id)),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn create_page_with_qr_takes_over_its_link() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let created = coordinator
            .create_qr(
                alice,
                NewQrInput {
                    link: Some("https://example.com".to_string()),
                    ..qr_named("Site")
                },
            )
            .await
            .unwrap();

        let page = coordinator
            .create_page(
                alice,
                PageDraft {
                    qr_id: Some(created.qr.id),
                    published: Some(true),
                    ..draft("landing")
                },
            )
            .await
            .unwrap();

        assert_eq!(page.qr_id, Some(created.qr.id));
        assert!(page.published);
        let qr = QRS.get(db.pool(), created.qr.id).await.unwrap().unwrap();
        assert_eq!(
            qr.link.as_deref(),
            Some(format!("{}/pages/landing", BASE_URL).as_str())
        );
    }

    #[tokio::test]
    async fn detaching_the_qr_clears_its_link() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let created = coordinator.create_qr(alice, qr_named("Menu")).await.unwrap();
        let page = created.page.unwrap();

        let updated = coordinator
            .update_page(
                alice,
                page.id,
                PagePatch {
                    qr_id: Some(None),
                    title: Some(Some("Lunch".to_string())),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.qr_id, None);
        assert_eq!(updated.title.as_deref(), Some("Lunch"));
        let qr = QRS.get(db.pool(), created.qr.id).await.unwrap().unwrap();
        assert_eq!(qr.link, None);
    }

    #[tokio::test]
    async fn dangling_children_persist_nothing() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let elements = vec![json!({
            "id": 1, "type": "frame", "x": 0, "y": 0,
            "width": 100, "height": 100, "children": [99]
        })];

        let err = coordinator
            .create_page(
                alice,
                PageDraft {
                    elements: elements.clone(),
                    ..draft("frames")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)), "{:?}", err);
        assert!(page_repo::find_by_name(db.pool(), "frames").await.unwrap().is_none());

        let page = coordinator.create_page(alice, draft("frames")).await.unwrap();
        let err = coordinator
            .update_page(
                alice,
                page.id,
                PagePatch {
                    elements: Some(elements),
                    published: Some(true),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)), "{:?}", err);
        let unchanged = PAGES.get(db.pool(), page.id).await.unwrap().unwrap();
        assert!(!unchanged.published);
        assert!(unchanged.elements.is_empty());
    }

    #[tokio::test]
    async fn validated_elements_are_stored_with_defaults() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);

        let page = coordinator
            .create_page(
                alice,
                PageDraft {
                    elements: vec![json!({
                        "id": 7, "type": "text", "x": 1, "y": 2, "text": "Hi"
                    })],
                    ..draft("hello")
                },
            )
            .await
            .unwrap();

        let stored = serde_json::to_value(&page.elements[0]).unwrap();
        assert_eq!(stored["font_family"], "Arial");
        assert_eq!(stored["font_size"], 16);
        assert_eq!(stored["text_align"], "left");
    }

    #[tokio::test]
    async fn deleting_a_page_unlinks_its_qr() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let created = coordinator.create_qr(alice, qr_named("Menu")).await.unwrap();
        let page = created.page.unwrap();
        coordinator
            .attach_files(alice, page.id, &[blob("a.png", 3)])
            .await
            .unwrap();

        let files = coordinator.delete_page(alice, page.id).await.unwrap();

        assert_eq!(files, vec!["a.png".to_string()]);
        let qr = QRS.get(db.pool(), created.qr.id).await.unwrap().unwrap();
        assert_eq!(qr.link, None);
        assert!(PAGES.get(db.pool(), page.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn files_attach_and_detach() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let page = coordinator.create_page(alice, draft("docs")).await.unwrap();

        let page = coordinator
            .attach_files(alice, page.id, &[blob("a.png", 3), blob("b.pdf", 5)])
            .await
            .unwrap();
        assert_eq!(page.files, vec!["a.png".to_string(), "b.pdf".to_string()]);

        let (page, orphaned) = coordinator.detach_file(alice, page.id, "a.png").await.unwrap();
        assert_eq!(page.files, vec!["b.pdf".to_string()]);
        assert!(orphaned);

        let err = coordinator
            .detach_file(alice, page.id, "a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn other_tenants_cannot_touch_pages() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let coordinator = coordinator(&db);
        let page = coordinator.create_page(alice, draft("private")).await.unwrap();
        let bob_qr = coordinator.create_qr(bob, qr_named("Bob")).await.unwrap();

        let results = [
            coordinator
                .update_page(bob, page.id, PagePatch::default())
                .await
                .err(),
            coordinator.delete_page(bob, page.id).await.err(),
            coordinator.attach_files(bob, page.id, &[]).await.err(),
            coordinator
                .update_page(
                    alice,
                    page.id,
                    PagePatch {
                        qr_id: Some(Some(bob_qr.qr.id)),
                        ..PagePatch::default()
                    },
                )
                .await
                .err(),
        ];
        for err in results {
            assert!(matches!(err, Some(AppError::NotFound(_))), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn file_lists_only_take_the_callers_uploads() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let coordinator = coordinator(&db);
        let alices = coordinator.create_page(alice, draft("alices")).await.unwrap();
        coordinator
            .attach_files(alice, alices.id, &[blob("secret.pdf", 4)])
            .await
            .unwrap();

        let err = coordinator
            .create_page(
                bob,
                PageDraft {
                    files: vec!["secret.pdf".to_string()],
                    ..draft("bobs")
                },
            )
            .await
            .unwrap_err();
        assert!(
            matches!(&err, AppError::InvalidField { field, .. } if field == "files"),
            "{:?}",
            err
        );
        assert!(page_repo::find_by_name(db.pool(), "bobs").await.unwrap().is_none());

        let bobs = coordinator.create_page(bob, draft("bobs")).await.unwrap();
        let err = coordinator
            .update_page(
                bob,
                bobs.id,
                PagePatch {
                    files: Some(vec!["secret.pdf".to_string()]),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }), "{:?}", err);
        assert!(coordinator.delete_page(bob, bobs.id).await.unwrap().is_empty());
        let alices = PAGES.get(db.pool(), alices.id).await.unwrap().unwrap();
        assert_eq!(alices.files, vec!["secret.pdf".to_string()]);
    }

    #[tokio::test]
    async fn shared_files_outlive_one_page() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let first = coordinator.create_page(alice, draft("first")).await.unwrap();
        coordinator
            .attach_files(alice, first.id, &[blob("logo.png", 3)])
            .await
            .unwrap();
        let second = coordinator
            .create_page(
                alice,
                PageDraft {
                    files: vec!["logo.png".to_string()],
                    ..draft("second")
                },
            )
            .await
            .unwrap();
        assert_eq!(second.files, vec!["logo.png".to_string()]);

        let (_, orphaned) = coordinator.detach_file(alice, first.id, "logo.png").await.unwrap();
        assert!(!orphaned);
        assert!(coordinator.delete_page(alice, first.id).await.unwrap().is_empty());
        assert_eq!(
            coordinator.delete_page(alice, second.id).await.unwrap(),
            vec!["logo.png".to_string()]
        );
    }

    async fn file_backed(dir: &tempfile::TempDir) -> Database {
        Database::connect(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("pages.db").display()),
            max_connections: 8,
            acquire_timeout_secs: 10,
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_creates_of_one_name_leave_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_backed(&dir).await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);

        for round in 0..5 {
            let name = format!("promo-{}", round);
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let coordinator = coordinator.clone();
                    let name = name.clone();
                    tokio::spawn(async move { coordinator.create_page(alice, draft(&name)).await })
                })
                .collect();

            let mut created = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => created += 1,
                    Err(err) => assert!(matches!(err, AppError::Conflict(_)), "{:?}", err),
                }
            }
            assert_eq!(created, 1, "round {}", round);
        }
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_of_distinct_names_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_backed(&dir).await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);

        let tasks: Vec<_> = (0..16)
            .map(|index| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .create_page(alice, draft(&format!("page-{}", index)))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(page_repo::list_for_user(db.pool(), alice).await.unwrap().len(), 16);
        db.close().await;
    }
}
