//! The backend query service seam.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use sqlbench_core::{ResultSet, ShapeError};
use thiserror::Error;

/// A boxed future for async collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Why a statement did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The service ran the statement and reported an error (syntax error,
    /// constraint violation, ...).
    #[error("{0}")]
    Rejected(String),

    /// The call itself failed before the service could answer.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl QueryError {
    /// Returns whether the service answered with an error.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the message shown to the user for a failed mutation.
    ///
    /// Service errors are shown verbatim; transport failures are prefixed
    /// with the action that failed.
    #[must_use]
    pub fn user_message(&self, action: &str) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Transport(message) => format!("Failed to {action}: {message}"),
        }
    }
}

/// What the service returned for a successful statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    /// Tabular rows.
    Rows(ResultSet),
    /// A plain text answer (for example a row count message).
    Text(String),
    /// Any other structured answer.
    Document(JsonValue),
}

impl QueryPayload {
    /// Interprets a JSON payload the way the result view renders it.
    ///
    /// Arrays of objects become rows, strings become text, `null` becomes
    /// an empty row set, everything else is kept as a document.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] if an array mixes objects with other values.
    pub fn from_json(value: JsonValue) -> Result<Self, ShapeError> {
        match value {
            JsonValue::Null => Ok(Self::Rows(ResultSet::default())),
            JsonValue::String(text) => Ok(Self::Text(text)),
            JsonValue::Array(items) if items.is_empty() || items.iter().any(JsonValue::is_object) => {
                ResultSet::from_json_rows(&items).map(Self::Rows)
            }
            other => Ok(Self::Document(other)),
        }
    }

    /// Returns the row set, if this payload is tabular.
    #[must_use]
    pub const fn rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Executes SQL on the backend.
///
/// One request, one response: the answer is either a payload or an error,
/// never both.
pub trait QueryService: Send + Sync {
    /// Executes a statement.
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<QueryPayload, QueryError>>;
}

impl<T: QueryService + ?Sized> QueryService for std::sync::Arc<T> {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<QueryPayload, QueryError>> {
        (**self).execute(sql)
    }
}
