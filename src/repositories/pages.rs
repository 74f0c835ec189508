use sqlx::{Executor, Sqlite};

use crate::{
    error::AppError,
    models::{
        elements::PageElement,
        pages::{Background, Page, ThemeSettings},
    },
    repositories::{Entity, Filter, NewRecord, Repository, SqlValue},
};

pub const PAGES: Repository<Page> = Repository::new();

impl Entity for Page {
    const TABLE: &'static str = "pages";
    const LABEL: &'static str = "Page";
    const TRACKS_UPDATES: bool = true;
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub user_id: i64,
    pub qr_id: Option<i64>,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub background: Background,
    pub elements: Vec<PageElement>,
    pub files: Vec<String>,
    pub published: bool,
    pub theme_settings: ThemeSettings,
}

impl NewPage {
    /// A blank unpublished page with default styling.
    pub fn blank(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            qr_id: None,
            name: name.into(),
            title: None,
            description: None,
            background: Background::default(),
            elements: Vec::new(),
            files: Vec::new(),
            published: false,
            theme_settings: ThemeSettings::default(),
        }
    }
}

impl NewRecord for NewPage {
    type Entity = Page;

    fn into_columns(self) -> Result<Vec<(&'static str, SqlValue)>, AppError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("qr_id", self.qr_id.into()),
            ("name", self.name.into()),
            ("title", self.title.into()),
            ("description", self.description.into()),
            ("background", SqlValue::json(&self.background)?),
            ("elements", SqlValue::json(&self.elements)?),
            ("files", SqlValue::json(&self.files)?),
            ("published", self.published.into()),
            ("theme_settings", SqlValue::json(&self.theme_settings)?),
        ])
    }
}

pub async fn find_owned<'e, X>(
    executor: X,
    page_id: i64,
    user_id: i64,
) -> Result<Option<Page>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    PAGES
        .find_one(executor, Filter::by_id(page_id).eq("user_id", user_id))
        .await
}

pub async fn list_for_user<'e, X>(executor: X, user_id: i64) -> Result<Vec<Page>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    PAGES.find(executor, Filter::new().eq("user_id", user_id)).await
}

/// The page currently attached to `qr_id`, if any.
pub async fn find_by_qr<'e, X>(executor: X, qr_id: i64) -> Result<Option<Page>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    PAGES.find_one(executor, Filter::new().eq("qr_id", qr_id)).await
}

pub async fn find_by_name<'e, X>(executor: X, name: &str) -> Result<Option<Page>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    PAGES.find_one(executor, Filter::new().eq("name", name)).await
}

pub async fn name_taken<'e, X>(executor: X, name: &str) -> Result<bool, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    PAGES.exists(executor, Filter::new().eq("name", name)).await
}

/// Whether any page still lists the blob `reference`.
pub async fn file_listed<'e, X>(executor: X, reference: &str) -> Result<bool, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    let found = crate::log_query_fetch_one!(
        "pages.file_listed",
        sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM pages, json_each(pages.files) WHERE json_each.value = ?)",
        )
        .bind(reference)
        .fetch_one(executor)
    )?;
    Ok(found != 0)
}
