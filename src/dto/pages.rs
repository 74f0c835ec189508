use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dto::double_option,
    models::{
        elements::PageElement,
        pages::{Background, Page, ThemeSettings},
    },
    usecases::ownership::{LinkBuilder, PageDraft, PagePatch},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePageRequest {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub background: Option<Background>,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub files: Vec<String>,
    pub published: Option<bool>,
    pub theme_settings: Option<ThemeSettings>,
    pub qr_id: Option<i64>,
}

impl From<CreatePageRequest> for PageDraft {
    fn from(req: CreatePageRequest) -> Self {
        Self {
            name: req.name,
            title: req.title,
            description: req.description,
            background: req.background,
            elements: req.elements,
            files: req.files,
            published: req.published,
            theme_settings: req.theme_settings,
            qr_id: req.qr_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePageRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub background: Option<Background>,
    pub elements: Option<Vec<Value>>,
    pub files: Option<Vec<String>>,
    pub published: Option<bool>,
    pub theme_settings: Option<ThemeSettings>,
    #[serde(default, deserialize_with = "double_option")]
    pub qr_id: Option<Option<i64>>,
}

impl From<UpdatePageRequest> for PagePatch {
    fn from(req: UpdatePageRequest) -> Self {
        Self {
            name: req.name,
            title: req.title,
            description: req.description,
            background: req.background,
            elements: req.elements,
            files: req.files,
            published: req.published,
            theme_settings: req.theme_settings,
            qr_id: req.qr_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub id: i64,
    pub user_id: i64,
    pub qr_id: Option<i64>,
    pub name: String,
    /// Canonical public URL of the page.
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub background: Background,
    pub elements: Vec<PageElement>,
    pub files: Vec<String>,
    pub published: bool,
    pub theme_settings: ThemeSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PageResponse {
    pub fn new(page: Page, links: &LinkBuilder) -> Self {
        Self {
            url: links.page_url(&page.name),
            id: page.id,
            user_id: page.user_id,
            qr_id: page.qr_id,
            name: page.name,
            title: page.title,
            description: page.description,
            background: page.background,
            elements: page.elements,
            files: page.files,
            published: page.published,
            theme_settings: page.theme_settings,
            created_at: page.created_at,
            updated_at: page.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_distinguishes_detach_from_untouched() {
        let detach: UpdatePageRequest =
            serde_json::from_value(json!({ "qr_id": null })).unwrap();
        let untouched: UpdatePageRequest =
            serde_json::from_value(json!({ "published": true })).unwrap();

        assert_eq!(PagePatch::from(detach).qr_id, Some(None));
        let patch = PagePatch::from(untouched);
        assert_eq!(patch.qr_id, None);
        assert_eq!(patch.published, Some(true));
    }

    #[test]
    fn create_request_defaults_collections() {
        let req: CreatePageRequest = serde_json::from_value(json!({ "name": "menu" })).unwrap();
        let draft = PageDraft::from(req);
        assert!(draft.elements.is_empty());
        assert!(draft.files.is_empty());
        assert_eq!(draft.qr_id, None);
    }
}
