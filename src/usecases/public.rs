use crate::{
    db::Database,
    dto::public::PublicPageResponse,
    error::AppError,
    models::pages::Page,
    repositories::pages as page_repo,
    services::blob_store::BlobStore,
    usecases::{files::read_listed_file, ownership::is_valid_page_name},
};

/// Unauthenticated reads. Only published pages are visible; anything else
/// is reported as missing.
pub struct PublicService;

impl PublicService {
    pub async fn get_page(db: &Database, name: &str) -> Result<PublicPageResponse, AppError> {
        let page = published_page(db, name).await?;
        Ok(PublicPageResponse::from(page))
    }

    pub async fn get_file(
        db: &Database,
        blobs: &BlobStore,
        name: &str,
        file: &str,
    ) -> Result<Vec<u8>, AppError> {
        let page = published_page(db, name).await?;
        read_listed_file(blobs, &page, file).await
    }
}

async fn published_page(db: &Database, name: &str) -> Result<Page, AppError> {
    if !is_valid_page_name(name) {
        return Err(AppError::NotFound("Page not found".to_string()));
    }
    page_repo::find_by_name(db.pool(), name)
        .await?
        .filter(|page| page.published)
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        testing::{coordinator, memory_db, seed_user},
        usecases::ownership::{PageDraft, PagePatch},
    };

    #[tokio::test]
    async fn only_published_pages_resolve() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        let page = coordinator
            .create_page(
                alice,
                PageDraft {
                    name: "menu".to_string(),
                    ..PageDraft::default()
                },
            )
            .await
            .unwrap();

        let err = PublicService::get_page(&db, "menu").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        coordinator
            .update_page(
                alice,
                page.id,
                PagePatch {
                    published: Some(true),
                    ..PagePatch::default()
                },
            )
            .await
            .unwrap();
        let document = PublicService::get_page(&db, "menu").await.unwrap();
        assert_eq!(document.id, page.id);
        assert_eq!(document.title, "menu");
        assert!(document.published);

        assert!(PublicService::get_page(&db, "missing").await.is_err());
        assert!(PublicService::get_page(&db, "../menu").await.is_err());
    }

    #[tokio::test]
    async fn document_orders_blocks_and_exposes_theme() {
        let db = memory_db().await;
        let alice = seed_user(&db, "alice").await;
        let coordinator = coordinator(&db);
        coordinator
            .create_page(
                alice,
                PageDraft {
                    name: "promo".to_string(),
                    title: Some("Promo".to_string()),
                    published: Some(true),
                    elements: vec![
                        json!({
                            "id": 1, "type": "rectangle", "x": 0, "y": 0,
                            "width": 10, "height": 10, "z_index": 5
                        }),
                        json!({ "id": 2, "type": "line", "x": 0, "y": 0, "x2": 5, "y2": 5 }),
                        json!({
                            "id": 3, "type": "text", "x": 0, "y": 0, "text": "Hi", "z_index": 5
                        }),
                    ],
                    ..PageDraft::default()
                },
            )
            .await
            .unwrap();

        let page = PublicService::get_page(&db, "promo").await.unwrap();
        let document = serde_json::to_value(page).unwrap();
        let ids: Vec<i64> = document["content"]["blocks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|block| block["id"].as_i64().unwrap())
            .collect();

        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(document["title"], "Promo");
        assert_eq!(document["content"]["theme"]["background"]["type"], "color");
        assert_eq!(document["content"]["theme"]["textColor"], "#ffffff");
        assert_eq!(document["content"]["theme"]["accentColor"], "#7c6afa");
        assert_eq!(document["content"]["settings"]["animations"]["enabled"], false);
    }
}
