use std::time::Instant;

use tracing::{Instrument, debug, info_span, warn};

use crate::error::app_error::is_unique_violation;

/// Runs one storage statement inside a `db_query` span and records latency,
/// row counts and failures. Unique violations are expected outcomes and are
/// logged at debug level.
pub async fn log_query<F, T, R>(
    statement: &str,
    query: F,
    row_counter: R,
) -> Result<T, sqlx::Error>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
    R: Fn(&T) -> Option<u64>,
{
    let span = info_span!("db_query", statement = %statement);
    let start = Instant::now();
    let result = query.instrument(span.clone()).await;
    let duration_ms = start.elapsed().as_millis();

    span.in_scope(|| match &result {
        Ok(value) => match row_counter(value) {
            Some(rows) => debug!(latency_ms = %duration_ms, rows = %rows, "Query executed"),
            None => debug!(latency_ms = %duration_ms, "Query executed"),
        },
        Err(error) if is_unique_violation(error) => {
            debug!(latency_ms = %duration_ms, error = %error, "Query hit unique constraint");
        }
        Err(error) => {
            warn!(latency_ms = %duration_ms, error = ?error, "Query failed");
        }
    });

    result
}

#[macro_export]
macro_rules! log_query_execute {
    ($name:expr, $query:expr) => {
        $crate::telemetry::database::log_query($name, $query, |result| {
            Some(result.rows_affected())
        })
        .await
    };
}

#[macro_export]
macro_rules! log_query_fetch_all {
    ($name:expr, $query:expr) => {
        $crate::telemetry::database::log_query($name, $query, |rows| Some(rows.len() as u64))
            .await
    };
}

#[macro_export]
macro_rules! log_query_fetch_optional {
    ($name:expr, $query:expr) => {
        $crate::telemetry::database::log_query($name, $query, |row| {
            Some(u64::from(row.is_some()))
        })
        .await
    };
}

#[macro_export]
macro_rules! log_query_fetch_one {
    ($name:expr, $query:expr) => {
        $crate::telemetry::database::log_query($name, $query, |_| Some(1)).await
    };
}
