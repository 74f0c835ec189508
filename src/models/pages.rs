use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::elements::PageElement;

pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";
pub const DEFAULT_THEME_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_THEME_ACCENT_COLOR: &str = "#7c6afa";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Page {
    pub id: i64,
    pub user_id: i64,
    pub qr_id: Option<i64>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[sqlx(json)]
    pub background: Background,
    #[sqlx(json)]
    pub elements: Vec<PageElement>,
    #[sqlx(json)]
    pub files: Vec<String>,
    pub published: bool,
    #[sqlx(json)]
    pub theme_settings: ThemeSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Color,
    Gradient,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub value: String,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Color,
            value: DEFAULT_BACKGROUND_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSettings {
    #[serde(default = "default_text_color", alias = "textColor")]
    pub text_color: String,
    #[serde(default = "default_accent_color", alias = "accentColor")]
    pub accent_color: String,
    #[serde(default)]
    pub animations: bool,
}

fn default_text_color() -> String {
    DEFAULT_THEME_TEXT_COLOR.to_string()
}

fn default_accent_color() -> String {
    DEFAULT_THEME_ACCENT_COLOR.to_string()
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            text_color: default_text_color(),
            accent_color: default_accent_color(),
            animations: false,
        }
    }
}
