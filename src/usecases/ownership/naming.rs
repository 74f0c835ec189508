use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::{error::AppError, repositories::pages as page_repo};

pub(crate) const PAGE_NAME_MAX_LEN: usize = 64;
pub(crate) const QR_NAME_MAX_LEN: usize = 255;
/// Leaves room for a `-{id}` suffix inside the page name limit.
const SLUG_BASE_MAX_LEN: usize = 40;
const RANDOM_SUFFIX_ATTEMPTS: usize = 3;

pub(crate) fn is_valid_page_name(name: &str) -> bool {
    (1..=PAGE_NAME_MAX_LEN).contains(&name.len())
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

pub(super) fn validate_page_name(name: &str) -> Result<(), AppError> {
    if is_valid_page_name(name) {
        Ok(())
    } else {
        Err(AppError::invalid_field(
            "name",
            "must be 1-64 letters, digits, '-' or '_'",
        ))
    }
}

pub(super) fn validate_qr_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_field("name", "is required"));
    }
    if trimmed.chars().count() > QR_NAME_MAX_LEN {
        return Err(AppError::invalid_field(
            "name",
            format!("must be at most {} characters", QR_NAME_MAX_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// External destinations must be absolute http(s) URLs with a host.
pub(super) fn validate_external_link(link: &str) -> Result<String, AppError> {
    let trimmed = link.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| AppError::invalid_field("link", "must be an http or https URL"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::invalid_field("link", "must be an http or https URL"));
    }
    Ok(trimmed.to_string())
}

pub(super) fn slugify(value: &str) -> String {
    let mut slug = String::new();
    let mut last_hyphen = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }

    let trimmed: String = slug.trim_matches('-').chars().take(SLUG_BASE_MAX_LEN).collect();
    let trimmed = trimmed.trim_matches('-');
    if trimmed.is_empty() {
        "page".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Picks a free page name for a QR: its slug, then `{slug}-{qr_id}`, then a
/// few random suffixes.
pub(super) async fn available_page_name(
    tx: &mut Transaction<'_, Sqlite>,
    qr_name: &str,
    qr_id: i64,
) -> Result<String, AppError> {
    let base = slugify(qr_name);
    let mut candidates = vec![base.clone(), format!("{}-{}", base, qr_id)];
    candidates.extend((0..RANDOM_SUFFIX_ATTEMPTS).map(|_| {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", base, &suffix[..8])
    }));

    for candidate in candidates {
        if !page_repo::name_taken(&mut **tx, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::Conflict(
        "Could not find a free page name for this QR".to_string(),
    ))
}
