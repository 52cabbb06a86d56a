//! One-time import of legacy client-side state.
//!
//! Older clients kept quick-access entries and history in browser local
//! storage. The reconciler copies them into the backend record store once,
//! guarded by the `migrated_to_backend` ledger flag in the client settings.
//!
//! Legacy history is newest first. The reconciler takes at most
//! [`HISTORY_LIMIT`] of the newest entries and inserts them oldest first, so
//! that ascending backend ids reproduce the original recency ranking.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::records::{HistoryAppend, RecordStore, HISTORY_LIMIT};
use crate::settings::{PersistedSettings, SettingsError};

/// A legacy quick-access entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyShortcut {
    /// Oldest format: only a table name.
    Table(String),
    /// A named statement.
    Named {
        /// Display name.
        name: String,
        /// Saved statement.
        sql: String,
    },
}

impl LegacyShortcut {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Table(name) | Self::Named { name, .. } => name,
        }
    }

    /// Returns the statement. A bare table name selects its first 50 rows.
    #[must_use]
    pub fn sql(&self) -> String {
        match self {
            Self::Table(name) => format!("SELECT * FROM {name} LIMIT 50"),
            Self::Named { sql, .. } => sql.clone(),
        }
    }
}

/// A legacy history entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyHistoryEntry {
    /// The executed statement.
    pub sql: String,
}

/// Legacy state as exported from local storage.
///
/// Each key holds either a JSON array or a string containing one, which is
/// how local storage keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyState {
    /// Quick-access entries in display order.
    #[serde(default, rename = "rcsl_quick_tables", deserialize_with = "array_or_encoded")]
    pub quick_tables: Vec<LegacyShortcut>,
    /// History, newest first.
    #[serde(default, rename = "rcsl_sql_history", deserialize_with = "array_or_encoded")]
    pub history: Vec<LegacyHistoryEntry>,
}

impl LegacyState {
    /// Parses an exported local-storage document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document or an encoded key is not valid.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns whether there is nothing to import.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quick_tables.is_empty() && self.history.is_empty()
    }
}

fn array_or_encoded<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(Vec::new()),
        JsonValue::String(encoded) if encoded.trim().is_empty() => Ok(Vec::new()),
        JsonValue::String(encoded) => serde_json::from_str(&encoded).map_err(D::Error::custom),
        other => serde_json::from_value(other).map_err(D::Error::custom),
    }
}

/// What a reconciliation run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Whether the import ran (`false` when the ledger flag was already set).
    pub ran: bool,
    /// Shortcuts created in the backend.
    pub shortcuts_created: usize,
    /// Shortcuts the backend refused (duplicate names, mostly).
    pub shortcuts_skipped: usize,
    /// History entries stored.
    pub history_added: usize,
    /// History entries the backend did not store.
    pub history_skipped: usize,
}

impl MigrationReport {
    /// Returns the number of records created in the backend.
    #[must_use]
    pub const fn migrated(&self) -> usize {
        self.shortcuts_created + self.history_added
    }
}

/// Imports legacy state into a record store at most once.
pub struct MigrationReconciler<'a, S: ?Sized> {
    store: &'a S,
    settings: &'a mut PersistedSettings,
}

impl<'a, S: RecordStore + ?Sized> MigrationReconciler<'a, S> {
    /// Creates a reconciler writing to `store` and guarded by the ledger
    /// flag in `settings`.
    pub fn new(store: &'a S, settings: &'a mut PersistedSettings) -> Self {
        Self { store, settings }
    }

    /// Returns whether the import still has to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.settings.get().migrated_to_backend
    }

    /// Runs the import if the ledger flag is not set, then sets it.
    ///
    /// Individual records that the store refuses are logged and skipped; the
    /// flag is set once processing finishes regardless.
    ///
    /// # Errors
    ///
    /// Returns an error only if the ledger flag cannot be persisted.
    pub async fn run(&mut self, legacy: &LegacyState) -> Result<MigrationReport, SettingsError> {
        if !self.is_pending() {
            return Ok(MigrationReport::default());
        }

        info!("Checking for data to migrate");
        let mut report = MigrationReport {
            ran: true,
            ..MigrationReport::default()
        };

        for shortcut in &legacy.quick_tables {
            let name = shortcut.name();
            match self.store.create_shortcut(name, &shortcut.sql()).await {
                Ok(_) => report.shortcuts_created += 1,
                Err(e) => {
                    warn!(shortcut = name, error = %e, "Skipping quick access entry during migration");
                    report.shortcuts_skipped += 1;
                }
            }
        }

        let newest: Vec<&LegacyHistoryEntry> = legacy.history.iter().take(HISTORY_LIMIT).collect();
        for entry in newest.into_iter().rev() {
            match self.store.add_history(&entry.sql).await {
                Ok(HistoryAppend::Added) => report.history_added += 1,
                Ok(HistoryAppend::IgnoredDuplicate) => report.history_skipped += 1,
                Err(e) => {
                    warn!(sql = %entry.sql, error = %e, "Skipping history entry during migration");
                    report.history_skipped += 1;
                }
            }
        }

        self.settings.update(|s| s.migrated_to_backend = true)?;
        info!(migrated = report.migrated(), "Migration finished");
        Ok(report)
    }
}
