//! Query service over a SQLite pool.

use std::sync::LazyLock;

use regex::Regex;
use sqlbench_client::{BoxFuture, QueryError, QueryPayload, QueryService};
use sqlbench_core::{ResultSet, Scalar};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::debug;

/// Leading keywords of statements that produce rows.
const ROW_KEYWORDS: [&str; 5] = ["select", "with", "pragma", "values", "explain"];

static RETURNING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\breturning\b").expect("returning pattern is valid"));

/// Executes arbitrary SQL against a SQLite database.
///
/// Statements that produce rows answer with [`QueryPayload::Rows`]; other
/// statements answer with a text payload reporting the affected row count.
#[derive(Debug, Clone)]
pub struct SqliteQueryService {
    pool: SqlitePool,
}

impl SqliteQueryService {
    /// Creates a service over `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run(&self, sql: &str) -> Result<QueryPayload, sqlx::Error> {
        if returns_rows(sql) {
            let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
            debug!(rows = rows.len(), "Statement returned rows");
            return Ok(QueryPayload::Rows(to_result_set(&rows)));
        }
        let done = sqlx::query(sql).execute(&self.pool).await?;
        Ok(QueryPayload::Text(format!(
            "{} row(s) affected",
            done.rows_affected()
        )))
    }
}

impl QueryService for SqliteQueryService {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<QueryPayload, QueryError>> {
        Box::pin(async move { self.run(sql).await.map_err(to_query_error) })
    }
}

/// Skips whitespace and any `--` or `/* */` comments before the first
/// keyword.
fn skip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}

/// Returns whether a statement is expected to produce rows.
#[must_use]
pub fn returns_rows(sql: &str) -> bool {
    let first = skip_leading_comments(sql)
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    ROW_KEYWORDS.contains(&first.as_str()) || RETURNING.is_match(sql)
}

/// Service-side failures are rejections; anything else is a transport
/// failure.
fn to_query_error(err: sqlx::Error) -> QueryError {
    match err {
        sqlx::Error::Database(db) => QueryError::Rejected(db.message().to_string()),
        other => QueryError::Transport(other.to_string()),
    }
}

fn to_scalar(row: &SqliteRow, idx: usize) -> Scalar {
    let Ok(raw) = row.try_get_raw(idx) else {
        return Scalar::Null;
    };
    if raw.is_null() {
        return Scalar::Null;
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get::<i64, _>(idx).map_or(Scalar::Null, Scalar::Int)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get::<f64, _>(idx).map_or(Scalar::Null, Scalar::Float)
        }
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map_or(Scalar::Null, |bytes| {
                Scalar::Text(String::from_utf8_lossy(&bytes).into_owned())
            }),
        _ => row
            .try_get::<String, _>(idx)
            .map_or(Scalar::Null, Scalar::Text),
    }
}

/// Converts fetched rows, keeping the statement's column order.
#[must_use]
pub fn to_result_set(rows: &[SqliteRow]) -> ResultSet {
    let records = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .map(|column| (column.name().to_string(), to_scalar(row, column.ordinal())))
                .collect()
        })
        .collect();
    ResultSet::from_records(records)
}
