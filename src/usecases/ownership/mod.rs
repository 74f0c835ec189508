//! Cross-entity consistency between users, QR codes and pages.
//!
//! Every operation runs inside one transaction and is scoped by the acting
//! user. A QR either carries an external link or owns exactly one page, in
//! which case its link is the page's canonical URL. Rows owned by someone else
//! are reported as missing.

mod naming;
mod pages;
mod qrs;
mod users;

use serde_json::Value;
use sqlx::{Sqlite, Transaction};

use crate::{
    db::Database,
    error::AppError,
    models::{
        pages::{Background, Page, ThemeSettings},
        qrs::Qr,
    },
    repositories::pages as page_repo,
};

pub(crate) use naming::is_valid_page_name;

/// Builds the canonical public URL of a page.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, name: &str) -> String {
        format!("{}/pages/{}", self.base, urlencoding::encode(name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewQrInput {
    pub name: String,
    pub description: Option<String>,
    /// External destination. Without one a blank page is provisioned.
    pub link: Option<String>,
    pub src: Option<String>,
    /// Name for the provisioned page instead of the generated one.
    pub page_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct QrPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub src: Option<String>,
    /// Setting an external link detaches the QR's page.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PageDraft {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub background: Option<Background>,
    pub elements: Vec<Value>,
    /// Blob references already listed on one of the caller's pages.
    pub files: Vec<String>,
    pub published: Option<bool>,
    pub theme_settings: Option<ThemeSettings>,
    pub qr_id: Option<i64>,
}

/// Partial page update. The outer `Option` is "leave unchanged"; for nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct PagePatch {
    pub name: Option<String>,
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub background: Option<Background>,
    pub elements: Option<Vec<Value>>,
    pub files: Option<Vec<String>>,
    pub published: Option<bool>,
    pub theme_settings: Option<ThemeSettings>,
    pub qr_id: Option<Option<i64>>,
}

#[derive(Debug, Clone)]
pub struct QrCreated {
    pub qr: Qr,
    pub page: Option<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeletion {
    pub qrs_deleted: u64,
    pub pages_deleted: u64,
    /// Blob references of the deleted pages, for cleanup after commit.
    pub files: Vec<String>,
}

#[derive(Clone)]
pub struct OwnershipCoordinator {
    db: Database,
    links: LinkBuilder,
}

impl OwnershipCoordinator {
    pub fn new(db: Database, links: LinkBuilder) -> Self {
        Self { db, links }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Opens a write transaction. `BEGIN IMMEDIATE` takes the write lock up
    /// front, so concurrent writers queue on the busy timeout instead of
    /// failing on lock upgrade, and the name checks see committed rows.
    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.db.pool().begin_with("BEGIN IMMEDIATE").await?)
    }
}

/// Of `files`, the references that no remaining page lists. Duplicates are
/// reported once.
async fn unlisted_files(
    tx: &mut Transaction<'_, Sqlite>,
    files: Vec<String>,
) -> Result<Vec<String>, AppError> {
    let mut unlisted: Vec<String> = Vec::new();
    for file in files {
        if !unlisted.contains(&file) && !page_repo::file_listed(&mut **tx, &file).await? {
            unlisted.push(file);
        }
    }
    Ok(unlisted)
}

fn qr_not_found() -> AppError {
    AppError::NotFound("QR not found".to_string())
}

fn page_not_found() -> AppError {
    AppError::NotFound("Page not found".to_string())
}

/// A row read back inside the transaction that wrote it must exist.
fn vanished(label: &str, id: i64) -> AppError {
    AppError::Internal(format!("{} {} disappeared inside its transaction", label, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_encodes_the_name() {
        let links = LinkBuilder::new("https://qr.example/");
        assert_eq!(links.page_url("promo"), "https://qr.example/pages/promo");
        assert_eq!(links.page_url("a b"), "https://qr.example/pages/a%20b");
    }
}
