//! SQLite-backed history and quick-access records.
//!
//! This module manages the `local_history` and `local_quick_access` tables.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlbench_client::records::require_fields;
use sqlbench_client::{
    BoxFuture, HistoryAppend, HistoryRecord, RecordStore, ShortcutRecord, StoreError, StoreResult,
    HISTORY_LIMIT,
};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

/// SQL to create the history table.
pub const CREATE_HISTORY_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS local_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sql_query TEXT NOT NULL,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
)
";

/// SQL to create the quick-access table.
pub const CREATE_QUICK_ACCESS_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS local_quick_access (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    sql_query TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    sort_order INTEGER DEFAULT 0
)
";

/// Keeps history and quick-access records in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Creates a store over `pool`. Call [`Self::ensure_tables`] before use.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Ensures both record tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the schema cannot be created.
    pub async fn ensure_tables(&self) -> StoreResult<()> {
        for sql in [CREATE_HISTORY_TABLE_SQL, CREATE_QUICK_ACCESS_TABLE_SQL] {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        }
        Ok(())
    }

    async fn newest_history(&self) -> StoreResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT sql_query FROM local_history ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;
        Ok(row.map(|(sql,)| sql))
    }
}

/// Parses a stored timestamp, accepting RFC 3339 and SQLite's own format.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
                .unwrap_or_else(|_| Utc::now())
        })
}

/// Unique-name violations become [`StoreError::NameExists`].
fn name_error(err: sqlx::Error, name: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::NameExists(name.to_string());
        }
    }
    StoreError::backend(err)
}

impl RecordStore for SqliteRecordStore {
    fn list_history(&self) -> BoxFuture<'_, StoreResult<Vec<HistoryRecord>>> {
        Box::pin(async move {
            let rows: Vec<(i64, String, Option<String>)> = sqlx::query_as(
                "SELECT id, sql_query, timestamp FROM local_history ORDER BY id DESC LIMIT ?",
            )
            .bind(HISTORY_LIMIT as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

            Ok(rows
                .into_iter()
                .map(|(id, sql, timestamp)| HistoryRecord {
                    id,
                    sql,
                    timestamp: timestamp.as_deref().map_or_else(Utc::now, parse_timestamp),
                })
                .collect())
        })
    }

    fn add_history<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, StoreResult<HistoryAppend>> {
        Box::pin(async move {
            require_fields(&[sql])?;
            if self.newest_history().await?.as_deref() == Some(sql) {
                debug!("Skipping repeat of the newest history entry");
                return Ok(HistoryAppend::IgnoredDuplicate);
            }
            sqlx::query("INSERT INTO local_history (sql_query) VALUES (?)")
                .bind(sql)
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;
            Ok(HistoryAppend::Added)
        })
    }

    fn delete_history(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM local_history WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn list_shortcuts(&self) -> BoxFuture<'_, StoreResult<Vec<ShortcutRecord>>> {
        Box::pin(async move {
            let rows: Vec<(i64, String, String)> = sqlx::query_as(
                "SELECT id, name, sql_query FROM local_quick_access \
                 ORDER BY sort_order ASC, created_at ASC, id ASC",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

            Ok(rows
                .into_iter()
                .map(|(id, name, sql)| ShortcutRecord { id, name, sql })
                .collect())
        })
    }

    fn create_shortcut<'a>(
        &'a self,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<ShortcutRecord>> {
        Box::pin(async move {
            require_fields(&[name, sql])?;
            let result = sqlx::query(
                "INSERT INTO local_quick_access (name, sql_query, sort_order) \
                 VALUES (?, ?, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM local_quick_access))",
            )
            .bind(name)
            .bind(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| name_error(e, name))?;

            Ok(ShortcutRecord {
                id: result.last_insert_rowid(),
                name: name.to_string(),
                sql: sql.to_string(),
            })
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
            let result =
                sqlx::query("UPDATE local_quick_access SET name = ?, sql_query = ? WHERE id = ?")
                    .bind(name)
                    .bind(sql)
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| name_error(e, name))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    fn delete_shortcut(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM local_quick_access WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;
            if result.rows_affected() == 0 {
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
            let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
            for (position, id) in (0_i64..).zip(ids) {
                let result = sqlx::query("UPDATE local_quick_access SET sort_order = ? WHERE id = ?")
                    .bind(position)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::backend)?;
                if result.rows_affected() == 0 {
                    tx.rollback().await.map_err(StoreError::backend)?;
                    return Err(StoreError::NotFound(*id));
                }
            }
            // Unlisted shortcuts move behind the listed ones, keeping their order.
            let sql = format!(
                "UPDATE local_quick_access SET sort_order = sort_order + ? WHERE id NOT IN ({})",
                vec!["?"; ids.len()].join(", ")
            );
            let mut shift = sqlx::query(&sql).bind(ids.len() as i64);
            for id in ids {
                shift = shift.bind(*id);
            }
            shift
                .execute(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
            tx.commit().await.map_err(StoreError::backend)?;
            debug!(count = ids.len(), "Saved shortcut order");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_store() -> SqliteRecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        let store = SqliteRecordStore::new(pool);
        store.ensure_tables().await.unwrap();
        store
    }

    async fn shortcut_names(store: &SqliteRecordStore) -> Vec<String> {
        store
            .list_shortcuts()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect()
    }

    #[test]
    fn test_parse_timestamp() {
        let sqlite = parse_timestamp("2024-03-01 12:30:00");
        assert_eq!(sqlite.to_rfc3339(), "2024-03-01T12:30:00+00:00");

        let rfc = parse_timestamp("2024-03-01T14:30:00+02:00");
        assert_eq!(rfc, sqlite);
    }

    #[tokio::test]
    async fn test_ensure_tables_is_idempotent() {
        let store = create_test_store().await;
        store.ensure_tables().await.unwrap();
        assert!(store.list_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_deduped() {
        let store = create_test_store().await;
        assert_eq!(store.add_history("SELECT 1").await.unwrap(), HistoryAppend::Added);
        assert_eq!(
            store.add_history("SELECT 1").await.unwrap(),
            HistoryAppend::IgnoredDuplicate
        );
        store.add_history("SELECT 2").await.unwrap();
        store.add_history("SELECT 1").await.unwrap();

        let sql: Vec<String> = store
            .list_history()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.sql)
            .collect();
        assert_eq!(sql, ["SELECT 1", "SELECT 2", "SELECT 1"]);
    }

    #[tokio::test]
    async fn test_history_limit() {
        let store = create_test_store().await;
        for i in 0..60 {
            store.add_history(&format!("SELECT {i}")).await.unwrap();
        }
        let history = store.list_history().await.unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].sql, "SELECT 59");
    }

    #[tokio::test]
    async fn test_delete_history() {
        let store = create_test_store().await;
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
    async fn test_shortcuts_append_in_creation_order() {
        let store = create_test_store().await;
        store.create_shortcut("a", "SELECT 1").await.unwrap();
        store.create_shortcut("b", "SELECT 2").await.unwrap();
        store.create_shortcut("c", "SELECT 3").await.unwrap();
        assert_eq!(shortcut_names(&store).await, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let store = create_test_store().await;
        let users = store.create_shortcut("users", "SELECT 1").await.unwrap();
        let orders = store.create_shortcut("orders", "SELECT 2").await.unwrap();

        let err = store.create_shortcut("users", "SELECT 3").await.unwrap_err();
        assert!(matches!(err, StoreError::NameExists(_)));
        assert_eq!(err.to_string(), "Name already exists");

        assert!(matches!(
            store.update_shortcut(orders.id, "users", "SELECT 2").await,
            Err(StoreError::NameExists(_))
        ));
        store
            .update_shortcut(users.id, "users", "SELECT * FROM users")
            .await
            .unwrap();
        assert_eq!(store.list_shortcuts().await.unwrap()[0].sql, "SELECT * FROM users");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let store = create_test_store().await;
        assert!(matches!(
            store.create_shortcut("", "SELECT 1").await,
            Err(StoreError::Invalid(_))
        ));
        assert!(matches!(store.add_history("").await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_reorder() {
        let store = create_test_store().await;
        let a = store.create_shortcut("a", "SELECT 1").await.unwrap();
        let b = store.create_shortcut("b", "SELECT 2").await.unwrap();
        let c = store.create_shortcut("c", "SELECT 3").await.unwrap();

        store.reorder_shortcuts(&[c.id, a.id, b.id]).await.unwrap();
        assert_eq!(shortcut_names(&store).await, ["c", "a", "b"]);

        store.reorder_shortcuts(&[b.id]).await.unwrap();
        assert_eq!(shortcut_names(&store).await, ["b", "c", "a"]);

        // A new shortcut lands after the reordered ones.
        store.create_shortcut("d", "SELECT 4").await.unwrap();
        assert_eq!(shortcut_names(&store).await, ["b", "c", "a", "d"]);
    }

    #[tokio::test]
    async fn test_reorder_unknown_id_rolls_back() {
        let store = create_test_store().await;
        let a = store.create_shortcut("a", "SELECT 1").await.unwrap();
        let b = store.create_shortcut("b", "SELECT 2").await.unwrap();

        assert!(matches!(
            store.reorder_shortcuts(&[b.id, 99, a.id]).await,
            Err(StoreError::NotFound(99))
        ));
        assert_eq!(shortcut_names(&store).await, ["a", "b"]);
        assert!(matches!(
            store.reorder_shortcuts(&[]).await,
            Err(StoreError::Invalid(_))
        ));
    }
}
