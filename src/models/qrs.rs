use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;

/// A scannable code. `link` is either caller supplied or the canonical URL of
/// the page that carries this QR's id; it is null while unresolved.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Qr {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub src: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
