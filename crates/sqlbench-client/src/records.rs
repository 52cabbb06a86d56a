//! History and quick-access records.
//!
//! The backend owns both collections. The client only keeps a cache that it
//! rebuilds after every mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::service::BoxFuture;

/// Maximum number of history entries returned by a listing.
pub const HISTORY_LIMIT: usize = 50;

/// Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A shortcut with this name already exists.
    #[error("Name already exists")]
    NameExists(String),

    /// No record has this id.
    #[error("Record not found: {0}")]
    NotFound(i64),

    /// The request itself was malformed.
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Rejects requests with an empty field.
///
/// # Errors
///
/// Returns [`StoreError::Invalid`] if any field is empty.
pub fn require_fields(fields: &[&str]) -> StoreResult<()> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(StoreError::Invalid("Missing fields".into()));
    }
    Ok(())
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Backend-assigned id. Higher ids are more recent.
    pub id: i64,
    /// The statement text.
    pub sql: String,
    /// When the statement was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A saved quick-access query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutRecord {
    /// Backend-assigned id, stable across reorders.
    pub id: i64,
    /// Display name, unique among shortcuts.
    pub name: String,
    /// The saved statement.
    pub sql: String,
}

/// What appending to history did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAppend {
    /// A new entry was stored.
    Added,
    /// The statement equals the newest entry and was not stored again.
    IgnoredDuplicate,
}

/// Backend storage for history and quick-access records.
pub trait RecordStore: Send + Sync {
    /// Lists history newest first, at most [`HISTORY_LIMIT`] entries.
    fn list_history(&self) -> BoxFuture<'_, StoreResult<Vec<HistoryRecord>>>;

    /// Appends a statement to history.
    fn add_history<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, StoreResult<HistoryAppend>>;

    /// Deletes one history entry.
    fn delete_history(&self, id: i64) -> BoxFuture<'_, StoreResult<()>>;

    /// Lists shortcuts in their persisted order.
    fn list_shortcuts(&self) -> BoxFuture<'_, StoreResult<Vec<ShortcutRecord>>>;

    /// Creates a shortcut at the end of the list.
    fn create_shortcut<'a>(
        &'a self,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<ShortcutRecord>>;

    /// Renames a shortcut or changes its statement.
    fn update_shortcut<'a>(
        &'a self,
        id: i64,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Deletes a shortcut.
    fn delete_shortcut(&self, id: i64) -> BoxFuture<'_, StoreResult<()>>;

    /// Persists a complete shortcut order.
    fn reorder_shortcuts<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, StoreResult<()>>;
}

impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    fn list_history(&self) -> BoxFuture<'_, StoreResult<Vec<HistoryRecord>>> {
        (**self).list_history()
    }

    fn add_history<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, StoreResult<HistoryAppend>> {
        (**self).add_history(sql)
    }

    fn delete_history(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        (**self).delete_history(id)
    }

    fn list_shortcuts(&self) -> BoxFuture<'_, StoreResult<Vec<ShortcutRecord>>> {
        (**self).list_shortcuts()
    }

    fn create_shortcut<'a>(
        &'a self,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<ShortcutRecord>> {
        (**self).create_shortcut(name, sql)
    }

    fn update_shortcut<'a>(
        &'a self,
        id: i64,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        (**self).update_shortcut(id, name, sql)
    }

    fn delete_shortcut(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        (**self).delete_shortcut(id)
    }

    fn reorder_shortcuts<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, StoreResult<()>> {
        (**self).reorder_shortcuts(ids)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    next_history_id: i64,
    history: BTreeMap<i64, HistoryRecord>,
    next_shortcut_id: i64,
    /// Shortcuts in persisted order.
    shortcuts: Vec<ShortcutRecord>,
}

/// A record store kept entirely in memory.
///
/// Ids are assigned in ascending order starting at 1, matching an
/// autoincrement column.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<MemoryState>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn list_history(&self) -> BoxFuture<'_, StoreResult<Vec<HistoryRecord>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .history
                .values()
                .rev()
                .take(HISTORY_LIMIT)
                .cloned()
                .collect())
        })
    }

    fn add_history<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, StoreResult<HistoryAppend>> {
        Box::pin(async move {
            require_fields(&[sql])?;
            let mut state = self.state.lock().await;
            if state.history.values().next_back().is_some_and(|h| h.sql == sql) {
                return Ok(HistoryAppend::IgnoredDuplicate);
            }
            state.next_history_id += 1;
            let id = state.next_history_id;
            state.history.insert(
                id,
                HistoryRecord {
                    id,
                    sql: sql.to_string(),
                    timestamp: Utc::now(),
                },
            );
            Ok(HistoryAppend::Added)
        })
    }

    fn delete_history(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state
                .history
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn list_shortcuts(&self) -> BoxFuture<'_, StoreResult<Vec<ShortcutRecord>>> {
        Box::pin(async move { Ok(self.state.lock().await.shortcuts.clone()) })
    }

    fn create_shortcut<'a>(
        &'a self,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<ShortcutRecord>> {
        Box::pin(async move {
            require_fields(&[name, sql])?;
            let mut state = self.state.lock().await;
            if state.shortcuts.iter().any(|s| s.name == name) {
                return Err(StoreError::NameExists(name.to_string()));
            }
            state.next_shortcut_id += 1;
            let record = ShortcutRecord {
                id: state.next_shortcut_id,
                name: name.to_string(),
                sql: sql.to_string(),
            };
            state.shortcuts.push(record.clone());
            Ok(record)
        })
    }

    fn update_shortcut<'a>(
        &'a self,
        id: i64,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            require_fields(&[name, sql])?;
            let mut state = self.state.lock().await;
            if state.shortcuts.iter().any(|s| s.name == name && s.id != id) {
                return Err(StoreError::NameExists(name.to_string()));
            }
            let record = state
                .shortcuts
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(StoreError::NotFound(id))?;
            record.name = name.to_string();
            record.sql = sql.to_string();
            Ok(())
        })
    }

    fn delete_shortcut(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let before = state.shortcuts.len();
            state.shortcuts.retain(|s| s.id != id);
            if state.shortcuts.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn reorder_shortcuts<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Err(StoreError::Invalid("Invalid order".into()));
            }
            let mut state = self.state.lock().await;
            if let Some(missing) = ids
                .iter()
                .find(|id| !state.shortcuts.iter().any(|s| s.id == **id))
            {
                return Err(StoreError::NotFound(*missing));
            }
            let mut ordered = Vec::with_capacity(state.shortcuts.len());
            for id in ids {
                if let Some(idx) = state.shortcuts.iter().position(|s| s.id == *id) {
                    ordered.push(state.shortcuts.remove(idx));
                }
            }
            // Ids missing from the request keep their relative order at the end.
            ordered.append(&mut state.shortcuts);
            state.shortcuts = ordered;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_newest_first_and_deduped() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.add_history("SELECT 1").await.unwrap(), HistoryAppend::Added);
        assert_eq!(
            store.add_history("SELECT 1").await.unwrap(),
            HistoryAppend::IgnoredDuplicate
        );
        store.add_history("SELECT 2").await.unwrap();
        store.add_history("SELECT 1").await.unwrap();

        let sqls: Vec<String> = store
            .list_history()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.sql)
            .collect();
        assert_eq!(sqls, ["SELECT 1", "SELECT 2", "SELECT 1"]);
    }

    #[tokio::test]
    async fn test_history_limit() {
        let store = MemoryRecordStore::new();
        for i in 0..60 {
            store.add_history(&format!("SELECT {i}")).await.unwrap();
        }
        let history = store.list_history().await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].sql, "SELECT 59");
    }

    #[tokio::test]
    async fn test_delete_history() {
        let store = MemoryRecordStore::new();
        store.add_history("SELECT 1").await.unwrap();
        let id = store.list_history().await.unwrap()[0].id;
        store.delete_history(id).await.unwrap();
        assert!(store.list_history().await.unwrap().is_empty());
        assert!(matches!(
            store.delete_history(id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_shortcut_names_are_unique() {
        let store = MemoryRecordStore::new();
        let a = store.create_shortcut("users", "SELECT * FROM users").await.unwrap();
        let b = store.create_shortcut("orders", "SELECT * FROM orders").await.unwrap();
        assert!(matches!(
            store.create_shortcut("users", "SELECT 1").await,
            Err(StoreError::NameExists(_))
        ));
        assert!(matches!(
            store.update_shortcut(b.id, "users", "SELECT 1").await,
            Err(StoreError::NameExists(_))
        ));
        store.update_shortcut(a.id, "users", "SELECT 2").await.unwrap();
        assert_eq!(store.list_shortcuts().await.unwrap()[0].sql, "SELECT 2");
    }

    #[tokio::test]
    async fn test_reorder() {
        let store = MemoryRecordStore::new();
        for name in ["a", "b", "c"] {
            store.create_shortcut(name, "SELECT 1").await.unwrap();
        }
        store.reorder_shortcuts(&[3, 1, 2]).await.unwrap();
        let names: Vec<String> = store
            .list_shortcuts()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert!(matches!(
            store.reorder_shortcuts(&[]).await,
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store.reorder_shortcuts(&[2, 99]).await,
            Err(StoreError::NotFound(99))
        ));
        assert_eq!(store.list_shortcuts().await.unwrap().len(), 3);
    }

    #[test]
    fn test_store_behind_arc() {
        let store = std::sync::Arc::new(MemoryRecordStore::new());
        let shared = std::sync::Arc::clone(&store);
        tokio_test::block_on(async move {
            shared.create_shortcut("users", "SELECT 1").await.unwrap();
        });
        let listed = tokio_test::block_on(store.list_shortcuts()).unwrap();
        assert_eq!(listed[0].name, "users");
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            store.add_history("").await,
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(
            store.create_shortcut("users", "").await,
            Err(StoreError::Invalid(_))
        ));
    }
}
