//! # sqlbench-client
//!
//! The stateful side of the SQL workbench: running statements, keeping the
//! result view, applying inline edits optimistically, ordering quick-access
//! shortcuts and importing legacy client state.
//!
//! The backend is reached through two traits:
//! - [`QueryService`] executes SQL and returns rows, text or a document
//! - [`RecordStore`] keeps history and quick-access records
//!
//! Both return boxed futures so that implementations can be swapped at run
//! time. [`MemoryRecordStore`] is a ready-made in-memory store; the
//! `sqlbench-sqlite` crate provides SQLite-backed implementations of both.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlbench_client::{MemoryRecordStore, MemorySettings, PersistedSettings, Workbench};
//!
//! let settings = PersistedSettings::open(MemorySettings::default())?;
//! let mut bench = Workbench::new(service, MemoryRecordStore::new(), settings);
//! bench.load().await;
//!
//! bench.set_editor("SELECT * FROM orders");
//! bench.run_query().await;
//!
//! if bench.view().session().is_some() {
//!     bench.edit_cell(0, "qty", "7").await?;
//! }
//! for notification in bench.take_notifications() {
//!     eprintln!("{notification}");
//! }
//! ```

pub mod error;
pub mod migration;
pub mod modal;
pub mod mutation;
pub mod notify;
pub mod records;
pub mod service;
pub mod settings;
pub mod shortcuts;
pub mod workbench;

pub use error::{ClientError, Result};
pub use migration::{
    LegacyHistoryEntry, LegacyShortcut, LegacyState, MigrationReconciler, MigrationReport,
};
pub use modal::{Modal, ModalField, ModalIntent};
pub use mutation::{
    CellEdit, CellMarker, CellSettled, EditSession, EditStatus, GridCell, GridRow, MutationError,
    PendingEdit, RowDeletion,
};
pub use notify::{Confirm, Notification, NotificationKind};
pub use records::{
    HistoryAppend, HistoryRecord, MemoryRecordStore, RecordStore, ShortcutRecord, StoreError,
    StoreResult, HISTORY_LIMIT,
};
pub use service::{BoxFuture, QueryError, QueryPayload, QueryService};
pub use settings::{
    ClientSettings, JsonFileSettings, MemorySettings, PersistedSettings, SettingsError,
    SettingsStore,
};
pub use shortcuts::{ItemGeometry, ShortcutList};
pub use workbench::{ResultView, Workbench};
