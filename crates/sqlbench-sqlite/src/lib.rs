//! # sqlbench-sqlite
//!
//! SQLite backends for the SQL workbench.
//!
//! - [`SqliteQueryService`] executes arbitrary statements against a database
//! - [`SqliteRecordStore`] keeps history and quick-access records
//!
//! The `sqlbench` binary wires both into a
//! [`Workbench`](sqlbench_client::Workbench) driven from the command line.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlbench_client::{MemorySettings, PersistedSettings, Workbench};
//! use sqlbench_sqlite::{connect, SqliteQueryService, SqliteRecordStore};
//!
//! let pool = connect("sqlite:app.db").await?;
//! let store = SqliteRecordStore::new(pool.clone());
//! store.ensure_tables().await?;
//!
//! let settings = PersistedSettings::open(MemorySettings::default())?;
//! let mut bench = Workbench::new(SqliteQueryService::new(pool), store, settings);
//! bench.load().await;
//! ```

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub mod query;
pub mod records;

pub use query::SqliteQueryService;
pub use records::SqliteRecordStore;

/// Opens a pool for `url`, creating the database file if needed.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the database cannot be opened.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
