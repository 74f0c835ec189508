use sqlx::{Executor, Sqlite};

use crate::{
    error::AppError,
    models::users::User,
    repositories::{Entity, Filter, NewRecord, Repository, SqlValue},
};

pub const USERS: Repository<User> = Repository::new();

impl Entity for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
    const TRACKS_UPDATES: bool = false;
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewRecord for NewUser {
    type Entity = User;

    fn into_columns(self) -> Result<Vec<(&'static str, SqlValue)>, AppError> {
        Ok(vec![
            ("username", self.username.into()),
            ("email", self.email.into()),
            ("password_hash", self.password_hash.into()),
        ])
    }
}

pub async fn find_by_email<'e, X>(executor: X, email: &str) -> Result<Option<User>, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    USERS
        .find_one(executor, Filter::new().eq("email", email))
        .await
}

pub async fn email_exists<'e, X>(executor: X, email: &str) -> Result<bool, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    USERS.exists(executor, Filter::new().eq("email", email)).await
}

pub async fn username_exists<'e, X>(executor: X, username: &str) -> Result<bool, AppError>
where
    X: Executor<'e, Database = Sqlite>,
{
    USERS
        .exists(executor, Filter::new().eq("username", username))
        .await
}
