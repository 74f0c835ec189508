use sqlx::{Executor, Sqlite};

use crate::{
    error::AppError,
    models::qrs::Qr,
    repositories::{Changeset, Entity, Filter, NewRecord, Repository, SqlValue},
};

pub const QRS: Repository<Qr> = Repository::new();

impl Entity for Qr {
    const TABLE: &'static str = "qrs";
    const LABEL: &'static str = "QR";
    const TRACKS_UPDATES: bool = true;
}

pub struct NewQr {
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub src: String,
}

impl NewRecord for NewQr {
    type Entity = Qr;

    fn into_columns(self) -> Result<Vec<(&'static str, SqlValue)>, AppError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("name", self.name.into()),
            ("description", self.description.into()),
            ("link", self.link.into()),
            ("src", self.src.into()),
        ])
    }
}

/// A QR scoped to its owner. Foreign rows look exactly like missing ones.
pub async fn find_owned<'e, X>(
    executor: X,
    qr_id: i64,
    user_id: i64,
) -> Result<Option<Qr>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    QRS.find_one(executor, Filter::by_id(qr_id).eq("user_id", user_id))
        .await
}

pub async fn list_for_user<'e, X>(executor: X, user_id: i64) -> Result<Vec<Qr>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    QRS.find(executor, Filter::new().eq("user_id", user_id)).await
}

pub async fn set_link<'e, X>(executor: X, qr_id: i64, link: Option<String>) -> Result<u64, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    QRS.update(executor, qr_id, Changeset::new().set("link", link))
        .await
}
