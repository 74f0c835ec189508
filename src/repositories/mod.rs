//! Keyed CRUD over the entity tables.
//!
//! [`Repository`] is written once and instantiated per entity through the
//! [`Entity`] trait. Every method takes an executor, so the same calls work on
//! the pool and inside a transaction opened by the ownership coordinator.

pub mod pages;
pub mod qrs;
pub mod users;

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, sqlite::SqliteRow};

use crate::error::{
    AppError,
    app_error::{is_unique_violation, unique_violation_target},
};

pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    const TABLE: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;
    /// Whether the table has an `updated_at` column that updates must bump.
    const TRACKS_UPDATES: bool;
}

/// A record that has not been stored yet.
pub trait NewRecord: Send {
    type Entity: Entity;

    fn into_columns(self) -> Result<Vec<(&'static str, SqlValue)>, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(SqlValue::Json)
            .map_err(|err| AppError::Internal(format!("failed to encode column: {}", err)))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: SqlValue) {
    match value {
        SqlValue::Null => builder.push("NULL"),
        SqlValue::Int(value) => builder.push_bind(value),
        SqlValue::Text(value) => builder.push_bind(value),
        SqlValue::Bool(value) => builder.push_bind(value),
        SqlValue::Json(value) => builder.push_bind(sqlx::types::Json(value)),
        SqlValue::Timestamp(value) => builder.push_bind(value),
    };
}

/// Equality conditions joined with `AND`. A `Null` value matches `IS NULL`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(&'static str, SqlValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.conditions.push((column, value.into()));
        self
    }

    fn push_where(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (index, (column, value)) in self.conditions.into_iter().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            builder.push(column);
            if value == SqlValue::Null {
                builder.push(" IS NULL");
            } else {
                builder.push(" = ");
                push_value(builder, value);
            }
        }
    }
}

/// Column assignments for a partial update.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    assignments: Vec<(&'static str, SqlValue)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn set_json<T: Serialize>(self, column: &'static str, value: &T) -> Result<Self, AppError> {
        Ok(self.set(column, SqlValue::json(value)?))
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.assignments
            .iter()
            .map(|(column, _)| column.to_string())
            .collect()
    }
}

pub struct Repository<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    pub async fn get<'e, X>(&self, executor: X, id: i64) -> Result<Option<E>, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        self.find_one(executor, Filter::by_id(id)).await
    }

    pub async fn find_one<'e, X>(&self, executor: X, filter: Filter) -> Result<Option<E>, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", E::TABLE));
        filter.push_where(&mut builder);
        builder.push(" LIMIT 1");

        let statement = format!("{}.find_one", E::TABLE);
        let record = crate::log_query_fetch_optional!(
            &statement,
            builder.build_query_as::<E>().fetch_optional(executor)
        )?;
        Ok(record)
    }

    /// Matching rows in insertion order.
    pub async fn find<'e, X>(&self, executor: X, filter: Filter) -> Result<Vec<E>, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT * FROM {}", E::TABLE));
        filter.push_where(&mut builder);
        builder.push(" ORDER BY id");

        let statement = format!("{}.find", E::TABLE);
        let records = crate::log_query_fetch_all!(
            &statement,
            builder.build_query_as::<E>().fetch_all(executor)
        )?;
        Ok(records)
    }

    pub async fn exists<'e, X>(&self, executor: X, filter: Filter) -> Result<bool, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT EXISTS(SELECT 1 FROM {}", E::TABLE));
        filter.push_where(&mut builder);
        builder.push(")");

        let statement = format!("{}.exists", E::TABLE);
        let found = crate::log_query_fetch_one!(
            &statement,
            builder.build_query_scalar::<i64>().fetch_one(executor)
        )?;
        Ok(found != 0)
    }

    /// Stores `record` and returns it with its surrogate key and defaults.
    pub async fn insert<'e, X, N>(&self, executor: X, record: N) -> Result<E, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
        N: NewRecord<Entity = E>,
    {
        let columns = record.into_columns()?;
        let mut builder = QueryBuilder::<Sqlite>::new(format!("INSERT INTO {} (", E::TABLE));
        {
            let mut names = builder.separated(", ");
            for (column, _) in &columns {
                names.push(*column);
            }
        }
        builder.push(") VALUES (");
        for (index, (_, value)) in columns.into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(") RETURNING *");

        let statement = format!("{}.insert", E::TABLE);
        crate::log_query_fetch_one!(&statement, builder.build_query_as::<E>().fetch_one(executor))
            .map_err(write_error::<E>)
    }

    pub async fn update<'e, X>(
        &self,
        executor: X,
        id: i64,
        changes: Changeset,
    ) -> Result<u64, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        self.update_where(executor, Filter::by_id(id), changes).await
    }

    /// Applies `changes` to every matching row; an empty changeset touches nothing.
    pub async fn update_where<'e, X>(
        &self,
        executor: X,
        filter: Filter,
        changes: Changeset,
    ) -> Result<u64, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        if changes.is_empty() {
            return Ok(0);
        }
        let mut assignments = changes.assignments;
        if E::TRACKS_UPDATES {
            assignments.push(("updated_at", SqlValue::Timestamp(Utc::now())));
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", E::TABLE));
        for (index, (column, value)) in assignments.into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(column);
            builder.push(" = ");
            push_value(&mut builder, value);
        }
        filter.push_where(&mut builder);

        let statement = format!("{}.update", E::TABLE);
        let result = crate::log_query_execute!(&statement, builder.build().execute(executor))
            .map_err(write_error::<E>)?;
        Ok(result.rows_affected())
    }

    pub async fn delete<'e, X>(&self, executor: X, id: i64) -> Result<u64, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        self.delete_where(executor, Filter::by_id(id)).await
    }

    pub async fn delete_where<'e, X>(&self, executor: X, filter: Filter) -> Result<u64, AppError>
    where
        X: Executor<'e, Database = Sqlite>,
    {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", E::TABLE));
        filter.push_where(&mut builder);

        let statement = format!("{}.delete", E::TABLE);
        let result = crate::log_query_execute!(&statement, builder.build().execute(executor))?;
        Ok(result.rows_affected())
    }
}

impl<E: Entity> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a rejected write into `Conflict` when a unique constraint fired.
fn write_error<E: Entity>(err: sqlx::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::from(err);
    }
    let column = unique_violation_target(&err)
        .and_then(|target| target.rsplit('.').next().map(str::to_string))
        .unwrap_or_else(|| "key".to_string());
    AppError::Conflict(format!("{} with this {} already exists", E::LABEL, column))
}
