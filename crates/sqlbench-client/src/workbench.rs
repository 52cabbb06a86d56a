//! The workbench session.
//!
//! [`Workbench`] ties the editor, the result view, history, shortcuts and the
//! dialog together over a [`QueryService`] and a [`RecordStore`]. Backend
//! failures during ordinary use never abort the session: they are turned
//! into [`Notification`]s and the view is left in a consistent state.

use serde_json::Value as JsonValue;
use sqlbench_core::{classify, ReadOnlyReason, ResultSet, Verdict};
use tracing::{debug, error};

use crate::error::{ClientError, Result};
use crate::migration::{LegacyState, MigrationReconciler, MigrationReport};
use crate::modal::{Modal, ModalIntent};
use crate::mutation::{CellEdit, EditSession, PendingEdit};
use crate::notify::{Confirm, Notification};
use crate::records::{HistoryRecord, RecordStore, StoreError};
use crate::service::{QueryError, QueryPayload, QueryService};
use crate::settings::{ClientSettings, PersistedSettings};
use crate::shortcuts::{ItemGeometry, ShortcutList};

/// Status line shown while a statement runs.
pub const STATUS_RUNNING: &str = "Running query...";
/// Status line after a successful statement.
pub const STATUS_SUCCESS: &str = "Query executed successfully.";
/// Status line after the service rejected a statement.
pub const STATUS_FAILED: &str = "Error executing query";
/// Notification shown when the service cannot be reached.
pub const NETWORK_ERROR: &str = "Network error or server unavailable.";
/// Notification for an incomplete shortcut form.
pub const MISSING_FIELDS: &str = "Please fill in all fields";
/// Notification when a new shortcut order could not be stored.
pub const REORDER_FAILED: &str = "Failed to save new order";

/// What the result area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    /// No rows, or nothing has run yet.
    Empty,
    /// A plain text answer.
    Text(String),
    /// A structured answer that is not a row list.
    Document(JsonValue),
    /// Rows shown without edit affordances.
    ReadOnly {
        /// The rows.
        result: ResultSet,
        /// Why editing is disabled.
        reason: ReadOnlyReason,
    },
    /// Rows that can be edited in place.
    Editable(EditSession),
}

impl ResultView {
    /// Placeholder text for an empty result.
    pub const EMPTY_MESSAGE: &'static str = "No results returned";

    fn from_payload(sql: &str, payload: QueryPayload) -> Self {
        match payload {
            QueryPayload::Rows(result) if result.is_empty() => Self::Empty,
            QueryPayload::Rows(result) => match classify(sql, &result) {
                Verdict::Editable { table, id_column } => {
                    match EditSession::new(sql, table, id_column, &result) {
                        Ok(session) => Self::Editable(session),
                        Err(_) => Self::ReadOnly {
                            result,
                            reason: ReadOnlyReason::NoIdColumn,
                        },
                    }
                }
                Verdict::ReadOnly(reason) => Self::ReadOnly { result, reason },
            },
            QueryPayload::Text(text) => Self::Text(text),
            QueryPayload::Document(doc) => Self::Document(doc),
        }
    }

    /// Returns the edit session, if the view is editable.
    #[must_use]
    pub const fn session(&self) -> Option<&EditSession> {
        match self {
            Self::Editable(session) => Some(session),
            _ => None,
        }
    }

    /// Returns the read-only reason, if the view shows read-only rows.
    #[must_use]
    pub const fn read_only_reason(&self) -> Option<ReadOnlyReason> {
        match self {
            Self::ReadOnly { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// One workbench session.
pub struct Workbench<Q, S> {
    service: Q,
    store: S,
    settings: PersistedSettings,
    editor: String,
    view: ResultView,
    status: String,
    running: bool,
    history: Vec<HistoryRecord>,
    shortcuts: ShortcutList,
    modal: Option<Modal>,
    notifications: Vec<Notification>,
}

impl<Q: QueryService, S: RecordStore> Workbench<Q, S> {
    /// Creates a session. Nothing is loaded until [`Self::load`] runs.
    pub fn new(service: Q, store: S, settings: PersistedSettings) -> Self {
        Self {
            service,
            store,
            settings,
            editor: String::new(),
            view: ResultView::Empty,
            status: String::new(),
            running: false,
            history: Vec::new(),
            shortcuts: ShortcutList::default(),
            modal: None,
            notifications: Vec::new(),
        }
    }

    /// Returns the query service.
    pub const fn service(&self) -> &Q {
        &self.service
    }

    /// Returns the record store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the client settings.
    pub const fn settings(&self) -> &ClientSettings {
        self.settings.get()
    }

    /// Returns the editor text.
    pub fn editor(&self) -> &str {
        &self.editor
    }

    /// Replaces the editor text.
    pub fn set_editor(&mut self, sql: impl Into<String>) {
        self.editor = sql.into();
    }

    /// Returns the result view.
    pub const fn view(&self) -> &ResultView {
        &self.view
    }

    /// Returns the status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns whether a statement is running.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the loaded history, newest first.
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Returns the shortcut list.
    pub const fn shortcuts(&self) -> &ShortcutList {
        &self.shortcuts
    }

    /// Returns the open dialog.
    pub const fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    /// Returns the notifications not yet taken.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drains the pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify_error(&mut self, message: impl Into<String>) {
        let notification = Notification::error(message);
        debug!(message = %notification.message, "Notifying user of failure");
        self.notifications.push(notification);
    }

    fn notify_info(&mut self, message: impl Into<String>) {
        let notification = Notification::info(message);
        debug!(message = %notification.message, "Notifying user");
        self.notifications.push(notification);
    }

    fn editable_mut(&mut self) -> Result<&mut EditSession> {
        match &mut self.view {
            ResultView::Editable(session) => Ok(session),
            _ => Err(ClientError::NotEditable),
        }
    }

    fn editable(&self) -> Result<&EditSession> {
        self.view.session().ok_or(ClientError::NotEditable)
    }

    // ---- startup ----

    /// Imports legacy state once, then reloads history and shortcuts.
    ///
    /// # Errors
    ///
    /// Returns an error only if the ledger flag cannot be persisted.
    pub async fn migrate(&mut self, legacy: &LegacyState) -> Result<MigrationReport> {
        let report = MigrationReconciler::new(&self.store, &mut self.settings)
            .run(legacy)
            .await?;
        if report.migrated() > 0 {
            self.notify_info(format!(
                "Migrated {} items to new database.",
                report.migrated()
            ));
        }
        self.load().await;
        Ok(report)
    }

    /// Loads history and shortcuts from the record store.
    pub async fn load(&mut self) {
        self.load_history().await;
        self.load_shortcuts().await;
    }

    /// Reloads history. A failure keeps the previous list.
    pub async fn load_history(&mut self) {
        match self.store.list_history().await {
            Ok(history) => self.history = history,
            Err(e) => error!(error = %e, "Failed to load history"),
        }
    }

    /// Reloads shortcuts. A failure keeps the previous list.
    pub async fn load_shortcuts(&mut self) {
        match self.store.list_shortcuts().await {
            Ok(shortcuts) => self.shortcuts.replace(shortcuts),
            Err(e) => error!(error = %e, "Failed to load quick access"),
        }
    }

    // ---- query execution ----

    /// Runs the editor text.
    ///
    /// Blank input does nothing. The previous view and its edit session are
    /// discarded before the statement runs.
    pub async fn run_query(&mut self) {
        let sql = self.editor.trim().to_string();
        if sql.is_empty() {
            return;
        }
        self.execute(&sql).await;
    }

    /// Returns whether the statement succeeded.
    async fn execute(&mut self, sql: &str) -> bool {
        self.running = true;
        self.view = ResultView::Empty;
        self.status = STATUS_RUNNING.to_string();
        debug!(sql, "Executing query");

        let outcome = self.service.execute(sql).await;
        self.running = false;

        match outcome {
            Ok(payload) => {
                self.view = ResultView::from_payload(sql, payload);
                if let Err(e) = self.store.add_history(sql).await {
                    error!(error = %e, "Failed to record history");
                }
                self.load_history().await;
                self.status = STATUS_SUCCESS.to_string();
                true
            }
            Err(QueryError::Rejected(message)) => {
                self.notify_error(message);
                self.status = STATUS_FAILED.to_string();
                false
            }
            Err(QueryError::Transport(message)) => {
                error!(error = %message, "Query service unreachable");
                self.notify_error(NETWORK_ERROR);
                false
            }
        }
    }

    // ---- history ----

    /// Copies a history entry into the editor.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownHistory`] if the entry is not loaded.
    pub fn recall_history(&mut self, id: i64) -> Result<()> {
        let entry = self
            .history
            .iter()
            .find(|h| h.id == id)
            .ok_or(ClientError::UnknownHistory(id))?;
        self.editor.clone_from(&entry.sql);
        Ok(())
    }

    /// Deletes a history entry and reloads the list.
    pub async fn delete_history(&mut self, id: i64) {
        if let Err(e) = self.store.delete_history(id).await {
            self.notify_error(e.to_string());
        }
        self.load_history().await;
    }

    /// Collapses or expands the history panel and remembers the choice.
    pub fn set_history_collapsed(&mut self, collapsed: bool) {
        if let Err(e) = self.settings.update(|s| s.history_collapsed = collapsed) {
            error!(error = %e, "Failed to persist history panel state");
        }
    }

    // ---- shortcuts ----

    /// Loads a shortcut's statement into the editor and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownShortcut`] if the shortcut is not
    /// loaded.
    pub async fn run_shortcut(&mut self, id: i64) -> Result<()> {
        let sql = self
            .shortcuts
            .get(id)
            .map(|s| s.sql.clone())
            .ok_or(ClientError::UnknownShortcut(id))?;
        self.editor = sql;
        self.run_query().await;
        Ok(())
    }

    /// Deletes a shortcut after the user confirms. Returns whether the
    /// shortcut was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownShortcut`] if the shortcut is not
    /// loaded.
    pub async fn delete_shortcut(&mut self, id: i64, confirm: &impl Confirm) -> Result<bool> {
        let name = self
            .shortcuts
            .get(id)
            .map(|s| s.name.clone())
            .ok_or(ClientError::UnknownShortcut(id))?;
        if !confirm.confirm(&format!("Delete \"{name}\"?")) {
            return Ok(false);
        }
        let deleted = match self.store.delete_shortcut(id).await {
            Ok(()) => true,
            Err(e) => {
                self.notify_error(e.to_string());
                false
            }
        };
        self.load_shortcuts().await;
        Ok(deleted)
    }

    /// Starts dragging a shortcut.
    pub fn drag_start(&mut self, id: i64) -> bool {
        self.shortcuts.drag_start(id)
    }

    /// Moves the dragged shortcut for the pointer position.
    pub fn drag_over(&mut self, pointer_y: f64, geometry: &[ItemGeometry]) -> bool {
        self.shortcuts.drag_over(pointer_y, geometry)
    }

    /// Ends the drag and persists the new order.
    pub async fn drag_end(&mut self) {
        if let Some(ids) = self.shortcuts.drag_end() {
            self.persist_order(&ids).await;
        }
    }

    /// Moves a shortcut between zero-based positions and persists the new
    /// order. Returns `false` if a position is out of range.
    pub async fn move_shortcut(&mut self, from: usize, to: usize) -> bool {
        if !self.shortcuts.move_item(from, to) {
            return false;
        }
        let ids = self.shortcuts.ordered_ids();
        self.persist_order(&ids).await;
        true
    }

    /// The local order stays as shown even if storing it fails.
    async fn persist_order(&mut self, ids: &[i64]) {
        if let Err(e) = self.store.reorder_shortcuts(ids).await {
            error!(error = %e, "Failed to save shortcut order");
            self.notify_error(REORDER_FAILED);
        }
    }

    // ---- dialog ----

    /// Opens the new-shortcut dialog.
    pub fn open_add_shortcut(&mut self) {
        self.modal = Some(Modal::add_shortcut());
    }

    /// Opens the edit dialog for a shortcut.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownShortcut`] if the shortcut is not
    /// loaded.
    pub fn open_edit_shortcut(&mut self, id: i64) -> Result<()> {
        let shortcut = self
            .shortcuts
            .get(id)
            .ok_or(ClientError::UnknownShortcut(id))?;
        self.modal = Some(Modal::edit_shortcut(shortcut));
        Ok(())
    }

    /// Opens the new-row dialog for the editable result.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotEditable`] if the result is not editable.
    pub fn open_add_row(&mut self) -> Result<()> {
        let session = self.editable()?;
        let modal = Modal::add_row(session.table(), session.insert_defaults(None)?, false);
        self.modal = Some(modal);
        Ok(())
    }

    /// Opens the new-row dialog prefilled from an existing row.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not editable or the row is unknown.
    pub fn open_duplicate_row(&mut self, row_key: usize) -> Result<()> {
        let session = self.editable()?;
        let modal = Modal::add_row(
            session.table(),
            session.insert_defaults(Some(row_key))?,
            true,
        );
        self.modal = Some(modal);
        Ok(())
    }

    /// Opens a read-only view of a row. Row keys are positions in the
    /// result as fetched and survive deletions of other rows.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoSuchRow`] if no such row is shown.
    pub fn open_row_detail(&mut self, row_key: usize) -> Result<()> {
        let entries: Vec<(String, String)> = match &self.view {
            ResultView::ReadOnly { result, .. } if row_key < result.len() => result
                .entries(row_key)
                .map(|(column, value)| (column.to_string(), value.to_string()))
                .collect(),
            ResultView::Editable(session) => {
                let row = session
                    .row(row_key)
                    .ok_or(ClientError::NoSuchRow(row_key))?;
                session
                    .columns()
                    .iter()
                    .zip(row.cells())
                    .map(|(column, cell)| (column.clone(), cell.display_value().to_string()))
                    .collect()
            }
            _ => return Err(ClientError::NoSuchRow(row_key)),
        };
        self.modal = Some(Modal::row_detail(entries));
        Ok(())
    }

    /// Sets a field of the open dialog. Returns `false` if there is no
    /// dialog or the field cannot be changed.
    pub fn set_modal_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.modal
            .as_mut()
            .is_some_and(|modal| modal.set_value(name, value))
    }

    /// Closes the dialog without acting on it.
    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    /// Acts on the open dialog according to its intent.
    ///
    /// The dialog closes when the action succeeds. On failure it stays open
    /// with its values, and a notification explains why.
    pub async fn confirm_modal(&mut self) {
        let Some(modal) = self.modal.clone() else {
            return;
        };
        let done = match &modal.intent {
            ModalIntent::AddShortcut => self.save_shortcut(None, &modal).await,
            ModalIntent::EditShortcut(id) => self.save_shortcut(Some(*id), &modal).await,
            ModalIntent::AddRow { table, columns } => {
                self.insert_row(table, columns, &modal).await
            }
            ModalIntent::ShowDetail => true,
        };
        if done {
            self.modal = None;
        }
    }

    async fn save_shortcut(&mut self, id: Option<i64>, modal: &Modal) -> bool {
        let name = modal.value(Modal::NAME_FIELD).unwrap_or_default().trim();
        let sql = modal.value(Modal::SQL_FIELD).unwrap_or_default().trim();
        if name.is_empty() || sql.is_empty() {
            self.notify_error(MISSING_FIELDS);
            return false;
        }

        let saved = match id {
            None => self.store.create_shortcut(name, sql).await.map(|_| ()),
            Some(id) => self.store.update_shortcut(id, name, sql).await,
        };
        match saved {
            Ok(()) => {
                self.load_shortcuts().await;
                true
            }
            Err(e @ StoreError::NameExists(_)) => {
                self.notify_error(e.to_string());
                false
            }
            Err(e) => {
                error!(error = %e, "Failed to save quick access");
                self.notify_error(e.to_string());
                false
            }
        }
    }

    /// Only the dialog's insert columns are submitted, in their form order.
    /// A failed refresh keeps its own status and notification.
    async fn insert_row(&mut self, table: &str, columns: &[String], modal: &Modal) -> bool {
        let Ok(session) = self.editable() else {
            self.notify_error(ClientError::NotEditable.to_string());
            return false;
        };
        let values: Vec<(String, String)> = columns
            .iter()
            .map(|column| {
                let value = modal.value(column).unwrap_or_default().to_string();
                (column.clone(), value)
            })
            .collect();
        let sql = session.insert_statement(&values);
        let source = session.source_sql().to_string();

        match self.service.execute(&sql).await {
            Ok(_) => {
                if self.execute(&source).await {
                    self.status = format!("Inserted new row into {table}");
                }
                true
            }
            Err(e) => {
                self.notify_error(e.user_message("insert"));
                false
            }
        }
    }

    // ---- inline edits ----

    /// Commits a typed value into a cell and submits the update.
    ///
    /// Returns the edit to submit, or `None` if the value is unchanged or
    /// queued behind an update already in flight. Pair with
    /// [`Self::settle_cell_edit`] when driving submissions yourself.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not editable, or the row or column
    /// cannot be edited.
    pub fn stage_cell_edit(
        &mut self,
        row_key: usize,
        column: &str,
        value: &str,
    ) -> Result<Option<PendingEdit>> {
        match self.editable_mut()?.begin_cell_edit(row_key, column, value)? {
            CellEdit::Submit(edit) => Ok(Some(edit)),
            CellEdit::Unchanged | CellEdit::Queued => Ok(None),
        }
    }

    /// Applies the outcome of a submitted cell edit. Returns a follow-up
    /// edit for the same cell, if one was queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is no longer editable or the edit is
    /// unknown.
    pub fn settle_cell_edit(
        &mut self,
        edit: &PendingEdit,
        outcome: &std::result::Result<QueryPayload, QueryError>,
    ) -> Result<Option<PendingEdit>> {
        let settled = self
            .editable_mut()?
            .finish_cell_edit(edit.id, outcome.is_ok())?;
        match outcome {
            Ok(_) => {
                self.status = format!("Updated {} for id = {}", edit.column, edit.row_id);
            }
            Err(e) => self.notify_error(e.user_message("update")),
        }
        Ok(settled.follow_up)
    }

    /// Commits a typed value into a cell and waits for the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not editable, or the row or column
    /// cannot be edited. Backend failures are notifications, not errors.
    pub async fn edit_cell(&mut self, row_key: usize, column: &str, value: &str) -> Result<()> {
        let mut next = self.stage_cell_edit(row_key, column, value)?;
        while let Some(edit) = next {
            let outcome = self.service.execute(&edit.sql).await;
            next = self.settle_cell_edit(&edit, &outcome)?;
        }
        Ok(())
    }

    /// Clears a cell's transient saved marker.
    pub fn settle_marker(&mut self, row_key: usize, column: &str) {
        if let Ok(session) = self.editable_mut() {
            session.settle_marker(row_key, column);
        }
    }

    /// Deletes a row after the user confirms. Returns whether the row was
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is not editable or the row is unknown.
    pub async fn delete_row(&mut self, row_key: usize, confirm: &impl Confirm) -> Result<bool> {
        let session = self.editable()?;
        let prompt = session.delete_prompt(row_key)?;
        if !confirm.confirm(&prompt) {
            return Ok(false);
        }
        let deletion = session.begin_delete(row_key)?;
        let table = session.table().to_string();

        let outcome = self.service.execute(&deletion.sql).await;
        let accepted = outcome.is_ok();
        self.editable_mut()?.finish_delete(&deletion, accepted);
        match outcome {
            Ok(_) => {
                self.status = format!("Deleted row id={} from {table}", deletion.row_id);
            }
            Err(e) => self.notify_error(e.user_message("delete")),
        }
        Ok(accepted)
    }
}
