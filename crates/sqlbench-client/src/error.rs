//! Error types for the workbench client.

use sqlbench_core::ShapeError;

use crate::mutation::MutationError;
use crate::records::StoreError;
use crate::service::QueryError;
use crate::settings::SettingsError;

/// Errors surfaced by workbench operations.
///
/// Failures of the backend during ordinary use are not returned as errors;
/// they become notifications. These variants cover misuse of the API and
/// failures that leave the client unable to continue.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The query service failed.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// The record store failed.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Settings could not be loaded or saved.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// An edit referred to something not in the grid.
    #[error("Edit error: {0}")]
    Mutation(#[from] MutationError),

    /// A payload could not be read as rows.
    #[error("Result shape error: {0}")]
    Shape(#[from] ShapeError),

    /// The operation needs an editable result on screen.
    #[error("The current result is not editable")]
    NotEditable,

    /// The operation needs a shown row.
    #[error("No row at position {0}")]
    NoSuchRow(usize),

    /// No shortcut has this id.
    #[error("Unknown shortcut: {0}")]
    UnknownShortcut(i64),

    /// No history entry has this id.
    #[error("Unknown history entry: {0}")]
    UnknownHistory(i64),
}

/// Result type for workbench operations.
pub type Result<T> = std::result::Result<T, ClientError>;
