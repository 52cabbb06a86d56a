//! Optimistic mutations on an editable result.
//!
//! An [`EditSession`] holds the grid shown for an editable result and the
//! edits in flight against it. The session never talks to the backend: it
//! hands out [`PendingEdit`]s carrying the synthesized statement, and the
//! caller reports the outcome back. The grid changes as follows:
//!
//! - a cell shows the typed value immediately and is marked as saving
//! - on success the value becomes the cell's baseline and the cell is
//!   briefly marked as saved
//! - on failure the cell shows its baseline again; the baseline never
//!   advances on failure
//!
//! Edits to the same cell are serialized. While one is in flight, further
//! values for that cell are queued; only the latest queued value is kept
//! and it is diffed against the baseline once the first edit settles.

use std::collections::BTreeMap;

use sqlbench_core::{
    insertable_columns, is_id_column, synthesize_delete, synthesize_insert, synthesize_update,
    ResultSet, Scalar,
};
use tracing::debug;

/// Errors raised when an edit refers to something not in the grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// No row has this key.
    #[error("Unknown row: {0}")]
    UnknownRow(usize),

    /// No column has this name.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// The column identifies rows and cannot be edited in place.
    #[error("Column '{0}' is not editable")]
    ReadOnlyColumn(String),

    /// No edit with this id is in flight.
    #[error("Unknown edit: {0}")]
    UnknownEdit(u64),
}

/// Visual state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellMarker {
    /// Nothing to show.
    #[default]
    Idle,
    /// An update for this cell is in flight.
    Saving,
    /// The last update succeeded; cleared by [`EditSession::settle_marker`].
    Saved,
}

/// Lifecycle of one edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    /// Submitted, awaiting the outcome.
    Applying,
    /// The backend accepted the statement.
    Committed,
    /// The backend refused the statement, or could not be reached.
    Reverted,
}

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    text: String,
    baseline: String,
    null: bool,
    marker: CellMarker,
    in_flight: Option<u64>,
    queued: Option<String>,
}

impl GridCell {
    fn new(value: &Scalar) -> Self {
        let text = value.edit_text();
        Self {
            baseline: text.clone(),
            text,
            null: value.is_null(),
            marker: CellMarker::Idle,
            in_flight: None,
            queued: None,
        }
    }

    /// Returns the displayed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the last value known to be stored in the backend.
    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Returns whether the stored value is NULL. The empty baseline of a
    /// NULL cell is indistinguishable from an empty string otherwise.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.null
    }

    /// Returns the value as a detail view shows it, with NULL spelled out.
    #[must_use]
    pub fn display_value(&self) -> &str {
        if self.null {
            "NULL"
        } else {
            &self.baseline
        }
    }

    /// Returns the visual marker.
    #[must_use]
    pub const fn marker(&self) -> CellMarker {
        self.marker
    }

    /// Returns whether an update for this cell is in flight.
    #[must_use]
    pub const fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }
}

/// One row of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    key: usize,
    row_id: String,
    cells: Vec<GridCell>,
}

impl GridRow {
    /// Returns the row's key within the session. Keys survive deletions of
    /// other rows.
    #[must_use]
    pub const fn key(&self) -> usize {
        self.key
    }

    /// Returns the row's id value as it is written into statements.
    #[must_use]
    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    /// Returns the cells in column order.
    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }
}

/// An edit between submission and outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    /// Session-unique edit id.
    pub id: u64,
    /// Key of the edited row.
    pub row_key: usize,
    /// Id value of the edited row.
    pub row_id: String,
    /// Edited column.
    pub column: String,
    /// Baseline at submission time.
    pub old_value: String,
    /// Submitted value.
    pub new_value: String,
    /// The synthesized UPDATE.
    pub sql: String,
    /// Current status.
    pub status: EditStatus,
}

/// What committing a cell value led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    /// The value equals the baseline; nothing is submitted.
    Unchanged,
    /// Another update for the cell is in flight; the value waits behind it.
    Queued,
    /// Submit this edit and report the outcome with
    /// [`EditSession::finish_cell_edit`].
    Submit(PendingEdit),
}

/// The outcome of a settled cell edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellSettled {
    /// The edit in its terminal state.
    pub edit: PendingEdit,
    /// A queued value for the same cell that now needs submitting.
    pub follow_up: Option<PendingEdit>,
}

/// A confirmed row deletion, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDeletion {
    /// Key of the row to remove.
    pub row_key: usize,
    /// Id value of the row.
    pub row_id: String,
    /// The synthesized DELETE.
    pub sql: String,
}

/// The grid and in-flight edits for one editable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    source_sql: String,
    table: String,
    id_column: String,
    id_index: usize,
    columns: Vec<String>,
    rows: Vec<GridRow>,
    pending: BTreeMap<u64, PendingEdit>,
    next_edit_id: u64,
}

impl EditSession {
    /// Builds the grid for `result`, which `source_sql` produced and which
    /// was classified editable against `table` keyed by `id_column`.
    ///
    /// NULL cells display as the empty string, which is also their baseline.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownColumn`] if `id_column` is not a
    /// column of `result`.
    pub fn new(
        source_sql: impl Into<String>,
        table: impl Into<String>,
        id_column: impl Into<String>,
        result: &ResultSet,
    ) -> Result<Self, MutationError> {
        let id_column = id_column.into();
        let id_index = result
            .column_index(|c| c == id_column)
            .ok_or_else(|| MutationError::UnknownColumn(id_column.clone()))?;

        let rows = result
            .rows()
            .iter()
            .enumerate()
            .map(|(key, row)| GridRow {
                key,
                row_id: row
                    .get(id_index)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                cells: row
                    .values()
                    .iter()
                    .map(GridCell::new)
                    .collect(),
            })
            .collect();

        Ok(Self {
            source_sql: source_sql.into(),
            table: table.into(),
            id_column,
            id_index,
            columns: result.columns().to_vec(),
            rows,
            pending: BTreeMap::new(),
            next_edit_id: 1,
        })
    }

    /// Returns the statement that produced the result.
    #[must_use]
    pub fn source_sql(&self) -> &str {
        &self.source_sql
    }

    /// Returns the edited table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the id column name.
    #[must_use]
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Returns the column names in display order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows currently shown.
    #[must_use]
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Returns a row by key.
    #[must_use]
    pub fn row(&self, row_key: usize) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.key == row_key)
    }

    /// Returns a cell by row key and column name.
    #[must_use]
    pub fn cell(&self, row_key: usize, column: &str) -> Option<&GridCell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.row(row_key)?.cells.get(idx)
    }

    /// Returns the edits currently in flight.
    pub fn pending(&self) -> impl Iterator<Item = &PendingEdit> {
        self.pending.values()
    }

    /// Returns whether a column can be edited in place.
    #[must_use]
    pub fn is_editable_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column) && !is_id_column(column)
    }

    fn locate(&self, row_key: usize, column: &str) -> Result<(usize, usize), MutationError> {
        let row_idx = self
            .rows
            .iter()
            .position(|r| r.key == row_key)
            .ok_or(MutationError::UnknownRow(row_key))?;
        let col_idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| MutationError::UnknownColumn(column.to_string()))?;
        if col_idx == self.id_index || is_id_column(column) {
            return Err(MutationError::ReadOnlyColumn(column.to_string()));
        }
        Ok((row_idx, col_idx))
    }

    /// Commits a typed value into a cell. Surrounding whitespace is
    /// dropped, so a blank entry stores NULL.
    ///
    /// # Errors
    ///
    /// Returns an error if the row or column is unknown, or the column is
    /// the id column.
    pub fn begin_cell_edit(
        &mut self,
        row_key: usize,
        column: &str,
        new_value: &str,
    ) -> Result<CellEdit, MutationError> {
        let new_value = new_value.trim();
        let (row_idx, col_idx) = self.locate(row_key, column)?;
        let row = &mut self.rows[row_idx];
        let cell = &mut row.cells[col_idx];
        cell.text = new_value.to_string();

        if cell.in_flight.is_some() {
            cell.queued = Some(new_value.to_string());
            return Ok(CellEdit::Queued);
        }
        if cell.baseline == new_value {
            return Ok(CellEdit::Unchanged);
        }

        let id = self.next_edit_id;
        self.next_edit_id += 1;
        let sql = synthesize_update(&self.table, &self.id_column, &row.row_id, column, new_value);
        debug!(%sql, edit = id, "submitting cell update");

        cell.marker = CellMarker::Saving;
        cell.in_flight = Some(id);
        let edit = PendingEdit {
            id,
            row_key,
            row_id: row.row_id.clone(),
            column: column.to_string(),
            old_value: cell.baseline.clone(),
            new_value: new_value.to_string(),
            sql,
            status: EditStatus::Applying,
        };
        self.pending.insert(id, edit.clone());
        Ok(CellEdit::Submit(edit))
    }

    /// Records the outcome of a submitted cell edit.
    ///
    /// If the row was deleted in the meantime the edit settles without
    /// touching the grid.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownEdit`] if the edit is not in flight.
    pub fn finish_cell_edit(
        &mut self,
        edit_id: u64,
        accepted: bool,
    ) -> Result<CellSettled, MutationError> {
        let mut edit = self
            .pending
            .remove(&edit_id)
            .ok_or(MutationError::UnknownEdit(edit_id))?;
        edit.status = if accepted {
            EditStatus::Committed
        } else {
            EditStatus::Reverted
        };

        let Ok((row_idx, col_idx)) = self.locate(edit.row_key, &edit.column) else {
            return Ok(CellSettled {
                edit,
                follow_up: None,
            });
        };

        let cell = &mut self.rows[row_idx].cells[col_idx];
        cell.in_flight = None;
        if accepted {
            cell.baseline.clone_from(&edit.new_value);
            cell.null = edit.new_value.is_empty();
            cell.marker = CellMarker::Saved;
        } else {
            cell.text = cell.baseline.clone();
            cell.marker = CellMarker::Idle;
        }

        let follow_up = match cell.queued.take() {
            Some(value) => match self.begin_cell_edit(edit.row_key, &edit.column, &value)? {
                CellEdit::Submit(next) => Some(next),
                CellEdit::Unchanged | CellEdit::Queued => None,
            },
            None => None,
        };

        Ok(CellSettled { edit, follow_up })
    }

    /// Clears a transient saved marker.
    pub fn settle_marker(&mut self, row_key: usize, column: &str) {
        if let Ok((row_idx, col_idx)) = self.locate(row_key, column) {
            let cell = &mut self.rows[row_idx].cells[col_idx];
            if cell.marker == CellMarker::Saved {
                cell.marker = CellMarker::Idle;
            }
        }
    }

    /// Returns the confirmation prompt for deleting a row.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownRow`] if the row is not shown.
    pub fn delete_prompt(&self, row_key: usize) -> Result<String, MutationError> {
        let row = self.row(row_key).ok_or(MutationError::UnknownRow(row_key))?;
        Ok(format!(
            "Are you sure you want to delete row with {} = {}?",
            self.id_column, row.row_id
        ))
    }

    /// Synthesizes the DELETE for a row the user confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownRow`] if the row is not shown.
    pub fn begin_delete(&self, row_key: usize) -> Result<RowDeletion, MutationError> {
        let row = self.row(row_key).ok_or(MutationError::UnknownRow(row_key))?;
        let sql = synthesize_delete(&self.table, &self.id_column, &row.row_id);
        debug!(%sql, "submitting row delete");
        Ok(RowDeletion {
            row_key,
            row_id: row.row_id.clone(),
            sql,
        })
    }

    /// Records the outcome of a row deletion. The row leaves the grid only
    /// if the backend accepted the statement.
    pub fn finish_delete(&mut self, deletion: &RowDeletion, accepted: bool) {
        if !accepted {
            return;
        }
        self.rows.retain(|r| r.key != deletion.row_key);
        self.pending.retain(|_, e| e.row_key != deletion.row_key);
    }

    /// Returns the columns a new row is asked for.
    #[must_use]
    pub fn insert_columns(&self) -> Vec<String> {
        insertable_columns(&self.columns)
    }

    /// Returns form defaults for a new row: empty, or copied from an
    /// existing row when duplicating.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownRow`] if the source row is not shown.
    pub fn insert_defaults(
        &self,
        source_row: Option<usize>,
    ) -> Result<Vec<(String, String)>, MutationError> {
        let columns = self.insert_columns();
        let Some(key) = source_row else {
            return Ok(columns.into_iter().map(|c| (c, String::new())).collect());
        };
        let row = self.row(key).ok_or(MutationError::UnknownRow(key))?;
        Ok(columns
            .into_iter()
            .map(|column| {
                let value = self
                    .columns
                    .iter()
                    .position(|c| *c == column)
                    .and_then(|idx| row.cells.get(idx))
                    .map(|cell| cell.baseline.clone())
                    .unwrap_or_default();
                (column, value)
            })
            .collect())
    }

    /// Synthesizes the INSERT for submitted form values. Values are trimmed,
    /// so a blank field stores NULL.
    #[must_use]
    pub fn insert_statement(&self, values: &[(String, String)]) -> String {
        let values: Vec<(&str, &str)> = values
            .iter()
            .map(|(column, value)| (column.as_str(), value.trim()))
            .collect();
        let sql = synthesize_insert(&self.table, &values);
        debug!(%sql, "submitting row insert");
        sql
    }
}
