use serde::Serialize;

use crate::models::{
    elements::{PageElement, paint_order},
    pages::{Background, Page},
};

/// Render-ready document of a published page.
#[derive(Debug, Serialize)]
pub struct PublicPageResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub published: bool,
    pub content: PublicContent,
}

#[derive(Debug, Serialize)]
pub struct PublicContent {
    pub blocks: Vec<PageElement>,
    pub theme: PublicTheme,
    pub settings: PublicSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTheme {
    pub background: Background,
    pub text_color: String,
    pub accent_color: String,
}

#[derive(Debug, Serialize)]
pub struct PublicSettings {
    pub animations: AnimationSettings,
}

#[derive(Debug, Serialize)]
pub struct AnimationSettings {
    pub enabled: bool,
}

impl From<Page> for PublicPageResponse {
    fn from(page: Page) -> Self {
        let blocks = paint_order(&page.elements).into_iter().cloned().collect();
        Self {
            id: page.id,
            title: page.title.unwrap_or_else(|| page.name.clone()),
            description: page.description,
            published: page.published,
            content: PublicContent {
                blocks,
                theme: PublicTheme {
                    background: page.background,
                    text_color: page.theme_settings.text_color,
                    accent_color: page.theme_settings.accent_color,
                },
                settings: PublicSettings {
                    animations: AnimationSettings {
                        enabled: page.theme_settings.animations,
                    },
                },
            },
        }
    }
}
